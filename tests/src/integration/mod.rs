//! Integration scenarios against a node bound to `127.0.0.1:0`.

#[cfg(test)]
mod support;

mod location_fanout;
mod trip_flows;
