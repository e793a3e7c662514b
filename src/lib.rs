//! EBS - an embeddable scripting language
//!
//! # Architecture
//!
//! ```text
//! ebs-config/  - shared configuration data (limits, phases)
//! ebs-vfs/     - read-only source providers for imports
//! ebs-core/    - lexer, parser, module resolver, interpreter
//! ebs-api/     - host entry points and error reports
//! ebs-cli/     - the `ebs` script runner
//! ```
//!
//! # Quick Start
//!
//! ```
//! use ebs::{run, RunConfig};
//!
//! let output = run("print 1 + 2; return \"done\";", &RunConfig::capturing()).unwrap();
//! assert_eq!(output.output, vec!["3"]);
//! assert_eq!(output.value.to_string(), "done");
//! ```

pub use ebs_api::*;
