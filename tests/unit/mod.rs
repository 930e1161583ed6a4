// Unit tests for services
mod model_client_test;
mod scrubber_test;
