pub mod pruner;
pub mod relevance;
