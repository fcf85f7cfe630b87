mod registry_tests;
mod relay_tests;
