pub mod config;
pub mod domain;
pub mod parser;
pub mod profiles;

pub use domain::{Account, ChatStatus, Message, Role, StructuredAnswer};
pub use parser::parse_structured_answer;
pub use profiles::{Feature, Profile, ProfileRegistry};
