use ppspeed_ir::Protocol;

use crate::oracle::SatOracle;

/// The fixed inputs shared by every step of one analysis run.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub protocol: &'a Protocol,
    pub oracle: &'a dyn SatOracle,
}

impl<'a> Context<'a> {
    pub fn new(protocol: &'a Protocol, oracle: &'a dyn SatOracle) -> Self {
        Self { protocol, oracle }
    }
}
