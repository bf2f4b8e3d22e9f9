//! Reading compiled CSS
//!
//! Tokenizes and parses the CSS produced by the LESS renderer and collects
//! the class names it exports as a CSS module.

mod error;
mod extract;
mod parser;
mod selector;
mod tokenizer;

pub use error::{CssError, CssResult, SourceLocation};
pub use extract::{extract_class_names, Composes, ComposesSource};
pub use parser::{AtRule, Declaration, GroupRule, Rule, StyleRule, Stylesheet};
pub use selector::{Combinator, Selector, SelectorPart};
pub use tokenizer::{Token, Tokenizer};
