//! CLI command implementations.
//!
//! | Module    | Commands handled                  |
//! |-----------|-----------------------------------|
//! | `run`     | `Run`                             |
//! | `inspect` | `Classify`, `Examples`, `Stages`  |
//! | `config`  | `Config`                          |

pub mod config;
pub mod inspect;
pub mod run;

pub use config::{cmd_config, load_validated};
pub use inspect::{cmd_classify, cmd_examples, cmd_stages};
pub use run::{RunOptions, cmd_run};
