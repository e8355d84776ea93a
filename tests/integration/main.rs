mod config_test;
mod scan_test;
