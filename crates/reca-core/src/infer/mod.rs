mod bp;
mod ipf;

pub use bp::{BpConfig, BpResult, joint_table, marginal_of, propagate};
pub use ipf::{Ipf, IpfConfig, IpfResult};
