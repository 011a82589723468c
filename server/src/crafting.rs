//! Static crafting recipes and the all-or-nothing craft operation.

use crate::error::IntentError;
use crate::inventory::Inventory;
use shared::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipe {
    pub item: Item,
    pub quantity: u32,
    pub ingredients: &'static [(Item, u32)],
}

pub const RECIPES: &[Recipe] = &[
    Recipe {
        item: Item::WoodPickaxe,
        quantity: 1,
        ingredients: &[(Item::Wood, 10)],
    },
    Recipe {
        item: Item::WoodSword,
        quantity: 1,
        ingredients: &[(Item::Wood, 25)],
    },
    Recipe {
        item: Item::WoodHelmet,
        quantity: 1,
        ingredients: &[(Item::Wood, 15)],
    },
    Recipe {
        item: Item::StonePickaxe,
        quantity: 1,
        ingredients: &[(Item::Wood, 10), (Item::Stone, 15)],
    },
    Recipe {
        item: Item::StoneSword,
        quantity: 1,
        ingredients: &[(Item::Wood, 10), (Item::Stone, 30)],
    },
    Recipe {
        item: Item::StoneHelmet,
        quantity: 1,
        ingredients: &[(Item::Wood, 10), (Item::Stone, 25)],
    },
];

pub fn find_recipe(item: Item) -> Option<&'static Recipe> {
    RECIPES.iter().find(|recipe| recipe.item == item)
}

/// Crafts `item` from the inventory's ingredients.
///
/// Every ingredient is checked before anything is touched, and the result is
/// staged on a copy, so a failed craft leaves the inventory exactly as it was.
/// The caller emits the single inventory change notification.
pub fn craft(inventory: &mut Inventory, item: Item) -> Result<&'static Recipe, IntentError> {
    let recipe = find_recipe(item).ok_or(IntentError::RecipeNotFound(item))?;

    for &(ingredient, required) in recipe.ingredients {
        if !inventory.contains(ingredient) {
            return Err(IntentError::MissingIngredient(ingredient));
        }
        let available = inventory.count(ingredient);
        if available < required {
            return Err(IntentError::InsufficientIngredient {
                item: ingredient,
                required,
                available,
            });
        }
    }

    let mut staged = inventory.clone();
    for &(ingredient, required) in recipe.ingredients {
        staged.remove(ingredient, required);
    }
    if !staged.add(recipe.item, recipe.quantity) {
        return Err(IntentError::InventoryFull(recipe.item));
    }

    *inventory = staged;
    Ok(recipe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_recipe_is_unique() {
        for recipe in RECIPES {
            assert_eq!(find_recipe(recipe.item), Some(recipe));
            assert!(!recipe.ingredients.is_empty());
        }
    }

    #[test]
    fn test_craft_consumes_ingredients() {
        let mut inventory = Inventory::new();
        inventory.add(Item::Wood, 12);

        craft(&mut inventory, Item::WoodPickaxe).unwrap();

        assert_eq!(inventory.count(Item::Wood), 2);
        assert_eq!(inventory.count(Item::WoodPickaxe), 1);
    }

    #[test]
    fn test_craft_multiple_ingredients() {
        let mut inventory = Inventory::new();
        inventory.add(Item::Wood, 10);
        inventory.add(Item::Stone, 20);

        craft(&mut inventory, Item::StonePickaxe).unwrap();

        assert!(!inventory.contains(Item::Wood));
        assert_eq!(inventory.count(Item::Stone), 5);
        assert_eq!(inventory.slot(0).unwrap().item(), Some(Item::Stone));
        assert_eq!(inventory.slot(1).unwrap().item(), Some(Item::StonePickaxe));
    }

    #[test]
    fn test_craft_without_recipe() {
        let mut inventory = Inventory::new();
        inventory.add(Item::Wood, 100);
        let before = inventory.clone();

        assert_eq!(
            craft(&mut inventory, Item::Apple),
            Err(IntentError::RecipeNotFound(Item::Apple))
        );
        assert_eq!(inventory, before);
    }

    #[test]
    fn test_failed_craft_is_atomic() {
        let mut inventory = Inventory::new();
        inventory.add(Item::Wood, 50);
        inventory.add(Item::Stone, 14);
        let before = inventory.clone();

        assert_eq!(
            craft(&mut inventory, Item::StonePickaxe),
            Err(IntentError::InsufficientIngredient {
                item: Item::Stone,
                required: 15,
                available: 14,
            })
        );
        assert_eq!(inventory, before);

        assert_eq!(
            craft(&mut inventory, Item::WoodSword),
            Ok(find_recipe(Item::WoodSword).unwrap())
        );
        assert_eq!(inventory.count(Item::Wood), 25);
    }

    #[test]
    fn test_missing_ingredient() {
        let mut inventory = Inventory::new();
        assert_eq!(
            craft(&mut inventory, Item::WoodHelmet),
            Err(IntentError::MissingIngredient(Item::Wood))
        );
        assert!(!inventory.has_changes());
    }

    #[test]
    fn test_craft_into_full_inventory_rolls_back() {
        let mut inventory = Inventory::new();
        inventory.add(Item::Wood, 30);
        for item in [
            Item::Stone,
            Item::Apple,
            Item::WoodHelmet,
            Item::WoodSword,
            Item::StoneHelmet,
            Item::StoneSword,
            Item::RawMeat,
        ] {
            inventory.add(item, 1);
        }
        let before = inventory.clone();

        assert_eq!(
            craft(&mut inventory, Item::WoodPickaxe),
            Err(IntentError::InventoryFull(Item::WoodPickaxe))
        );
        assert_eq!(inventory, before);
    }
}
