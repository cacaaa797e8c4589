mod validator_test;
mod api_test;
