mod test_utils;
mod leader_tests;
mod volume_tests;
