pub mod token_kind;
