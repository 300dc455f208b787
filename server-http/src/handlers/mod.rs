pub mod health;
pub mod items;

pub use health::health_check;
pub use items::{
    add_item, compare_and_swap_item, decrement_item, delete_item, get_item, get_items,
    increment_item, replace_item, set_item, touch_item,
};
