mod compute_pass;
mod present_pass;

pub use self::compute_pass::*;
pub use self::present_pass::*;
