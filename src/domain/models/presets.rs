#[cfg(test)]
#[path = "presets_test.rs"]
mod tests;

/// A predefined prompt shortcut.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preset {
    pub key: &'static str,
    pub name: &'static str,
    pub prompt: &'static str,
}

pub const PRESETS: [Preset; 4] = [
    Preset {
        key: "modern-minimalist",
        name: "Modern Minimalist",
        prompt: "Transform this into a modern, minimalist garden with clean lines, gravel beds, a few structural plants like bamboo or Japanese maple, and a simple water feature.",
    },
    Preset {
        key: "english-cottage",
        name: "English Cottage",
        prompt: "Redesign this space as a classic English cottage garden. Add overflowing flower beds with roses, lavender, and delphiniums, a winding stone path, and a rustic wooden bench.",
    },
    Preset {
        key: "wildflower-meadow",
        name: "Wildflower Meadow",
        prompt: "Convert this area into a natural wildflower meadow with native grasses and a vibrant mix of colorful, pollinator-friendly flowers. Make it look untamed and beautiful.",
    },
    Preset {
        key: "zen-garden",
        name: "Zen Garden",
        prompt: "Create a serene Japanese Zen garden. Incorporate raked sand, carefully placed boulders, a stone lantern, moss, and a single, elegant bonsai tree.",
    },
];

impl Preset {
    /// Matches on either the key or the display name, ignoring case.
    pub fn find(text: &str) -> Option<Preset> {
        let needle = text.trim().to_lowercase();
        return PRESETS.iter().copied().find(|preset| {
            return preset.key == needle || preset.name.to_lowercase() == needle;
        });
    }

    pub fn keys() -> Vec<&'static str> {
        return PRESETS.iter().map(|preset| return preset.key).collect();
    }
}
