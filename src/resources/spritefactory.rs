//! Sprite construction from sheet metadata.
//!
//! The [`SpriteFactory`] must be given a [`SpriteSheet`] and a renderer maker
//! before use; creating a sprite from an unconfigured factory is a
//! programming error and fails with
//! [`EngineError::FactoryNotConfigured`].

use serde::{Deserialize, Serialize};

use crate::components::animation::{AnimationState, CycleType};
use crate::components::renderer::Renderer;
use crate::components::sprite::Sprite;
use crate::error::{EngineError, EngineResult};
use crate::resources::spritesheet::SpriteSheet;

/// Builds the renderer for a sprite, given the sprite's base name.
pub type RendererMaker = Box<dyn Fn(&str) -> Box<dyn Renderer>>;

/// Authored description of one animation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSpec {
    pub name: String,
    /// Frame interval in milliseconds; 0 means static.
    #[serde(default)]
    pub interval_ms: f64,
    #[serde(default)]
    pub cycle: CycleType,
}

impl StateSpec {
    pub fn new(name: impl Into<String>, interval_ms: f64, cycle: CycleType) -> Self {
        Self {
            name: name.into(),
            interval_ms,
            cycle,
        }
    }
}

#[derive(Default)]
pub struct SpriteFactory {
    sheet: Option<SpriteSheet>,
    renderer_maker: Option<RendererMaker>,
}

impl SpriteFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, sheet: SpriteSheet) -> Self {
        self.sheet = Some(sheet);
        self
    }

    pub fn with_renderer(mut self, maker: impl Fn(&str) -> Box<dyn Renderer> + 'static) -> Self {
        self.renderer_maker = Some(Box::new(maker));
        self
    }

    /// The animation state `spec` describes for sprites named `base`.
    /// States whose frames are missing from the sheet come back empty.
    pub fn state(&self, base: &str, spec: &StateSpec) -> EngineResult<AnimationState> {
        let sheet = self
            .sheet
            .as_ref()
            .ok_or(EngineError::FactoryNotConfigured("sprite sheet"))?;
        Ok(AnimationState::new(sheet.frames_for(base, &spec.name))
            .with_interval_ms(spec.interval_ms)
            .with_cycle(spec.cycle))
    }

    /// Create a sprite named after `base` with the given states. The first
    /// state that has frames becomes active.
    pub fn create(&self, base: &str, states: &[StateSpec]) -> EngineResult<Sprite> {
        let maker = self
            .renderer_maker
            .as_ref()
            .ok_or(EngineError::FactoryNotConfigured("renderer maker"))?;
        let mut sprite = Sprite::new(base, maker(base));
        for spec in states {
            let state = self.state(base, spec)?;
            sprite.set_state_frames(&spec.name, state);
        }
        Ok(sprite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::animation::FrameData;
    use crate::components::renderer::NullRenderer;

    fn factory() -> SpriteFactory {
        let mut sheet = SpriteSheet::new();
        sheet.insert("coin_spin0", FrameData::new(0.0, 0.0, 8.0, 8.0));
        sheet.insert("coin_spin1", FrameData::new(8.0, 0.0, 8.0, 8.0));
        sheet.insert("coin_still", FrameData::new(16.0, 0.0, 10.0, 10.0));
        SpriteFactory::new()
            .with_sheet(sheet)
            .with_renderer(|_| Box::new(NullRenderer))
    }

    #[test]
    fn test_create_registers_states_in_order() {
        let sprite = factory()
            .create(
                "coin",
                &[
                    StateSpec::new("spin", 100.0, CycleType::Loop),
                    StateSpec::new("still", 0.0, CycleType::None),
                ],
            )
            .unwrap();
        assert_eq!(sprite.state(), Some("spin"));
        assert!(sprite.has_state("still"));
        assert_eq!(sprite.dimensions().width, 8.0);
        assert!(sprite.id().starts_with("coin#"));
    }

    #[test]
    fn test_missing_frames_skip_the_state() {
        let sprite = factory()
            .create(
                "coin",
                &[
                    StateSpec::new("melt", 100.0, CycleType::Loop),
                    StateSpec::new("still", 0.0, CycleType::None),
                ],
            )
            .unwrap();
        assert!(!sprite.has_state("melt"));
        assert_eq!(sprite.state(), Some("still"));
    }

    #[test]
    fn test_unconfigured_factory_fails() {
        let no_renderer = SpriteFactory::new().with_sheet(SpriteSheet::new());
        assert!(matches!(
            no_renderer.create("coin", &[]),
            Err(EngineError::FactoryNotConfigured("renderer maker"))
        ));

        let no_sheet = SpriteFactory::new().with_renderer(|_| Box::new(NullRenderer));
        assert!(matches!(
            no_sheet.create("coin", &[StateSpec::new("spin", 0.0, CycleType::Loop)]),
            Err(EngineError::FactoryNotConfigured("sprite sheet"))
        ));
    }

    #[test]
    fn test_state_spec_defaults_from_json() {
        let spec: StateSpec = serde_json::from_str(r#"{ "name": "idle" }"#).unwrap();
        assert_eq!(spec, StateSpec::new("idle", 0.0, CycleType::Loop));
    }
}
