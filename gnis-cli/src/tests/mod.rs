//! Shared test harness modules for the GNIS CLI.

use super::*;

mod helpers;
mod steps;
