mod queue_test;
mod support;
