//! The general store.
//!
//! Stock is fixed and unlimited. Anything in an inventory can be sold back for a
//! configured share of its value, rounded down, so a buy followed by a sell never
//! makes money.

use crate::game::types::NewItem;

/// One line of the shop listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShopItem {
    pub name: &'static str,
    pub description: &'static str,
    pub price: u64,
    pub hp_effect: i32,
}

impl ShopItem {
    pub fn to_new_item(&self) -> NewItem {
        NewItem::new(self.name, self.description, self.price, self.hp_effect)
    }
}

pub const SHOP_ITEMS: [ShopItem; 3] = [
    ShopItem {
        name: "Health Potion",
        description: "Restores 25 HP.",
        price: 50,
        hp_effect: 25,
    },
    ShopItem {
        name: "Strength Potion",
        description: "A fizzing tonic. Tastes of iron.",
        price: 75,
        hp_effect: 0,
    },
    ShopItem {
        name: "Magic Shield",
        description: "A palm-sized ward that hums faintly.",
        price: 100,
        hp_effect: 0,
    },
];

/// Case-insensitive lookup by item name.
pub fn find_shop_item(name: &str) -> Option<&'static ShopItem> {
    let wanted = name.trim();
    SHOP_ITEMS
        .iter()
        .find(|item| item.name.eq_ignore_ascii_case(wanted))
}

/// floor(value × ratio), with the ratio clamped to [0, 1].
pub fn sell_price(value: u64, ratio: f64) -> u64 {
    let ratio = ratio.clamp(0.0, 1.0);
    ((value as f64) * ratio).floor() as u64
}

pub fn format_shop_listing() -> String {
    let mut out = String::from("=== SHOP ===\n");
    for item in SHOP_ITEMS.iter() {
        out.push_str(&format!("{} - {} GP", item.name, item.price));
        if item.hp_effect > 0 {
            out.push_str(&format!(" (+{} HP)", item.hp_effect));
        }
        out.push('\n');
    }
    out.push_str("BUY <name> <item> to purchase");
    out
}
