pub mod recipes;
pub mod relations;
pub mod shopping_list;
