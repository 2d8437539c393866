use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Material name that marks a slot as holding nothing.
pub const EMPTY_MATERIAL: &str = "air";

/// Presentation flags that hide parts of the content tooltip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFlag {
    HideEnchants,
    HideAttributes,
    HideUnbreakable,
    HideDestroys,
    HidePlacedOn,
    HideEffects,
}

/// Visual payload placed into a panel slot.
///
/// Built fluently:
///
/// ```
/// use grid_panel::CellContent;
///
/// let sword = CellContent::of("diamond_sword")
///     .name("Excalibur")
///     .description(["Sharp.", "Very sharp."])
///     .glowing();
/// assert_eq!(sword.amount, 1);
/// assert!(!sword.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellContent {
    pub material: String,
    pub amount: u8,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub description: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub enchantments: Vec<(String, u16)>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub flags: BTreeSet<ContentFlag>,
    #[serde(default)]
    pub glowing: bool,
}

impl CellContent {
    pub fn of(material: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            amount: 1,
            name: None,
            description: Vec::new(),
            enchantments: Vec::new(),
            flags: BTreeSet::new(),
            glowing: false,
        }
    }

    /// The content of an empty slot.
    pub fn empty() -> Self {
        Self::of(EMPTY_MATERIAL)
    }

    pub fn amount(mut self, amount: u8) -> Self {
        self.amount = amount;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the description lines.
    pub fn description<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.description = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Add (or re-level) an enchantment.
    pub fn enchant(mut self, enchantment: impl Into<String>, level: u16) -> Self {
        let enchantment = enchantment.into();
        match self.enchantments.iter_mut().find(|(name, _)| *name == enchantment) {
            Some(entry) => entry.1 = level,
            None => self.enchantments.push((enchantment, level)),
        }
        self
    }

    pub fn flag(mut self, flag: ContentFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    /// Make the content shimmer without listing an enchantment.
    pub fn glowing(mut self) -> Self {
        self.glowing = true;
        self.flags.insert(ContentFlag::HideEnchants);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0 || self.material.eq_ignore_ascii_case(EMPTY_MATERIAL)
    }

    /// Short human readable label used by text displays.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.material)
    }

    pub(crate) fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        match serde_json::to_vec(self) {
            Ok(bytes) => {
                hasher.update(&bytes);
            }
            Err(_) => {
                hasher.update(format!("{self:?}").as_bytes());
            }
        }
        hasher.finalize()
    }
}
