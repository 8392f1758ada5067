//! End-to-end controller tests against a simulated chip.

mod charger_tests;
mod mock_hw;
