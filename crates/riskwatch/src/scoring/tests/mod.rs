mod common;

mod aggregator;
