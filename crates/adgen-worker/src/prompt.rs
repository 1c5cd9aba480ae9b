//! Prompt rendering.
//!
//! A prompt is built from a [`PromptTemplate`] and the campaign research.
//! Sections always appear in the same order:
//!
//! 1. role, purpose and operating instructions (only those the template sets)
//! 2. product information
//! 3. angle
//! 4. hook slot (hook prompts only)
//! 5. hook (script prompts only)
//! 6. avatar (only when an avatar analysis exists)
//!
//! Missing research fields render as [`PLACEHOLDER`] so the layout never
//! changes between campaigns. Rendering does no I/O.

use std::fmt::Write;

use adgen_models::{Angle, AvatarAnalysis, ProductInfo, ScriptVariant, HOOKS_PER_ANGLE};

/// Text rendered in place of a missing field.
pub const PLACEHOLDER: &str = "Not specified";

/// Number of angles requested from the model.
pub const ANGLE_COUNT: usize = 5;

/// Opening styles cycled through the hook slots of an angle.
const HOOK_STYLES: [&str; 7] = [
    "a direct question to the viewer",
    "a bold, specific claim",
    "a surprising number or statistic",
    "the first line of a personal story",
    "calling out a pain point by name",
    "an open loop that creates curiosity",
    "a contrarian take on common advice",
];

/// Template fragments. A `None` fragment omits its section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptTemplate {
    pub role: Option<String>,
    pub purpose: Option<String>,
    pub instructions: Option<String>,
}

impl PromptTemplate {
    pub fn new(
        role: impl Into<String>,
        purpose: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            role: Some(role.into()),
            purpose: Some(purpose.into()),
            instructions: Some(instructions.into()),
        }
    }

    /// Template for generating marketing angles.
    pub fn angles() -> Self {
        Self::new(
            "You are a senior direct-response strategist for short-form video ads.",
            "Find the distinct marketing angles this product can be sold on.",
            format!(
                "Return ONLY a JSON array of exactly {ANGLE_COUNT} objects and nothing else.\n\
                 Each object has the fields \"category\" (a short label), \"concept\" \
                 (one or two sentences) and \"type\" (\"positive\" or \"negative\").\n\
                 Mix positive angles (desire, aspiration) with negative ones (pain, fear).\n\
                 Do not number the angles."
            ),
        )
    }

    /// Template for generating hooks for one angle.
    pub fn hooks() -> Self {
        Self::new(
            "You are a copywriter who writes scroll-stopping opening lines for video ads.",
            "Write one hook for the angle below.",
            format!(
                "Write a single hook of at most 20 words.\n\
                 It is one of {HOOKS_PER_ANGLE} hooks for this angle; use the opening style of its hook slot.\n\
                 Return only the hook text, without quotes or commentary."
            ),
        )
    }

    /// Template for the script variant.
    pub fn script(variant: ScriptVariant) -> Self {
        match variant {
            ScriptVariant::DirectResponse => Self::new(
                "You are a direct-response video ad scriptwriter.",
                "Expand the hook below into a complete direct-response ad script.",
                "Open with the hook verbatim.\n\
                 Follow with problem, agitation, solution, proof and a clear call to action.\n\
                 Keep it under 60 seconds when read aloud.\n\
                 Return only the script.",
            ),
            ScriptVariant::StoryDriven => Self::new(
                "You are a storyteller who writes narrative video ads.",
                "Expand the hook below into a story-driven ad script.",
                "Open with the hook verbatim.\n\
                 Tell a short first-person story of a customer whose life changes with the product.\n\
                 End with a soft call to action.\n\
                 Keep it under 60 seconds when read aloud.\n\
                 Return only the script.",
            ),
        }
    }
}

/// Research inputs for one prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub product: &'a ProductInfo,
    pub angle: Option<&'a Angle>,
    /// 1-based hook ordinal within the angle
    pub hook_slot: Option<u32>,
    pub hook: Option<&'a str>,
    pub avatar: Option<&'a AvatarAnalysis>,
}

impl<'a> PromptInput<'a> {
    pub fn new(product: &'a ProductInfo) -> Self {
        Self {
            product,
            angle: None,
            hook_slot: None,
            hook: None,
            avatar: None,
        }
    }

    pub fn with_angle(mut self, angle: &'a Angle) -> Self {
        self.angle = Some(angle);
        self
    }

    pub fn with_hook_slot(mut self, slot: u32) -> Self {
        self.hook_slot = Some(slot);
        self
    }

    pub fn with_hook(mut self, hook: &'a str) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn with_avatar(mut self, avatar: Option<&'a AvatarAnalysis>) -> Self {
        self.avatar = avatar;
        self
    }
}

/// Render a prompt. Identical inputs always give a byte-identical prompt.
pub fn render(template: &PromptTemplate, input: &PromptInput<'_>) -> String {
    let mut out = String::new();

    if let Some(role) = &template.role {
        section(&mut out, "ROLE", role);
    }
    if let Some(purpose) = &template.purpose {
        section(&mut out, "PURPOSE", purpose);
    }
    if let Some(instructions) = &template.instructions {
        section(&mut out, "OPERATING INSTRUCTIONS", instructions);
    }

    section(&mut out, "PRODUCT INFORMATION", &product_block(input.product));

    if let Some(angle) = input.angle {
        section(&mut out, "ANGLE", &angle_block(angle));
    }
    if let Some(slot) = input.hook_slot {
        section(&mut out, "HOOK SLOT", &hook_slot_block(slot));
    }
    if let Some(hook) = input.hook {
        section(&mut out, "HOOK", or_placeholder(Some(hook)));
    }
    if let Some(avatar) = input.avatar {
        section(&mut out, "AVATAR", &avatar_block(avatar));
    }

    out.truncate(out.trim_end().len());
    out
}

fn section(out: &mut String, title: &str, body: &str) {
    // Writing to a String cannot fail.
    let _ = write!(out, "{}:\n{}\n\n", title, body.trim_end());
}

fn or_placeholder(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => PLACEHOLDER,
    }
}

fn list_or_placeholder(values: &[String]) -> String {
    let items: Vec<&str> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();

    if items.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        items.join("; ")
    }
}

fn product_block(product: &ProductInfo) -> String {
    format!(
        "Name: {}\nDescription: {}\nPrice: {}\nKey features: {}\nTarget audience: {}\nUnique selling proposition: {}",
        or_placeholder(product.name.as_deref()),
        or_placeholder(product.description.as_deref()),
        or_placeholder(product.price.as_deref()),
        list_or_placeholder(&product.key_features),
        or_placeholder(product.target_audience.as_deref()),
        or_placeholder(product.unique_selling_proposition.as_deref()),
    )
}

fn angle_block(angle: &Angle) -> String {
    format!(
        "Angle {}: {}\nConcept: {}\nPolarity: {}",
        angle.position,
        or_placeholder(Some(&angle.category)),
        or_placeholder(Some(&angle.concept)),
        angle.polarity.as_str(),
    )
}

fn hook_slot_block(slot: u32) -> String {
    let style = HOOK_STYLES[(slot.saturating_sub(1) as usize) % HOOK_STYLES.len()];
    format!("Hook {} of {}\nOpen with {}.", slot, HOOKS_PER_ANGLE, style)
}

fn avatar_block(avatar: &AvatarAnalysis) -> String {
    format!(
        "Name: {}\nDemographics: {}\nPsychographics: {}\nPain points: {}\nDesires: {}\nObjections: {}\nCustomer journey: {}",
        or_placeholder(avatar.name.as_deref()),
        or_placeholder(avatar.demographics.as_deref()),
        or_placeholder(avatar.psychographics.as_deref()),
        list_or_placeholder(&avatar.pain_points),
        list_or_placeholder(&avatar.desires),
        list_or_placeholder(&avatar.objections),
        or_placeholder(avatar.customer_journey.as_deref()),
    )
}
