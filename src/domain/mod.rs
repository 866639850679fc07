// Domain layer: entities, value objects and the pure hierarchy algorithms
pub mod menu_item;
pub mod menu_tree;
pub mod permission;
pub mod role;
