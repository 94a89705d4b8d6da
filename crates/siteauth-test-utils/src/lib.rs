// siteauth-test-utils: shared adapter testing infrastructure.
//
// - `fixtures`: record builders with unique keys
// - `conformance`: behavioral checks every `Adapter` must pass

pub mod conformance;
pub mod fixtures;

pub use conformance::run_all;
