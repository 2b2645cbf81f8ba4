//! Turns pipeline results into a renderable ticket description.

use std::path::PathBuf;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::types::{
    LuckyNumber, TicketMessage, TicketTemplate, LUCKY_NUMBER_MAX, LUCKY_NUMBER_MIN,
};
use crate::composition::CompositionResult;
use crate::media::{GenerationRequest, ImageRef, MediaKind};

/// The random inputs of one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDraw {
    pub lucky_number: LuckyNumber,
    pub template: TicketTemplate,
    pub message: TicketMessage,
}

impl TicketDraw {
    /// Draw number, template and message uniformly and independently.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            lucky_number: LuckyNumber::clamped(
                rng.random_range(LUCKY_NUMBER_MIN..=LUCKY_NUMBER_MAX),
            ),
            template: TicketTemplate::ALL
                .choose(rng)
                .copied()
                .unwrap_or(TicketTemplate::Golden),
            message: TicketMessage::ALL
                .choose(rng)
                .copied()
                .unwrap_or(TicketMessage::GreatFortune),
        }
    }
}

/// Everything the presentation layer needs to draw one ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketViewDescriptor {
    /// Composed photo, or the source photo when composition fell back.
    pub photo: ImageRef,
    pub composed: bool,
    pub template: TicketTemplate,
    pub lucky_number: LuckyNumber,
    pub message: TicketMessage,
    pub kind: MediaKind,
    /// Source aspect ratio, used to fit the photo window.
    pub aspect_ratio: f64,
}

/// Builds [`TicketViewDescriptor`]s and locates template images.
#[derive(Debug, Clone)]
pub struct TicketComposer {
    templates_dir: PathBuf,
}

impl TicketComposer {
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
        }
    }

    /// Target image sent to the composition service for `template`.
    pub fn template_image(&self, template: TicketTemplate) -> ImageRef {
        ImageRef::Local(self.templates_dir.join(template.file_name()))
    }

    /// Pure: the same inputs always give the same descriptor.
    pub fn compose(
        &self,
        request: &GenerationRequest,
        composition: &CompositionResult,
        template: TicketTemplate,
        lucky_number: &LuckyNumber,
        message: TicketMessage,
    ) -> TicketViewDescriptor {
        let aspect_ratio = if request.height > 0 {
            f64::from(request.width) / f64::from(request.height)
        } else {
            1.0
        };

        TicketViewDescriptor {
            photo: composition.image.clone(),
            composed: !composition.is_fallback(),
            template,
            lucky_number: lucky_number.clone(),
            message,
            kind: request.media_kind,
            aspect_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn request() -> GenerationRequest {
        GenerationRequest {
            source_photo: ImageRef::local("/data/sources/a.png"),
            media_kind: MediaKind::Photo,
            width: 800,
            height: 400,
        }
    }

    #[test]
    fn test_draw_stays_within_fixed_sets() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let draw = TicketDraw::random(&mut rng);
            let value: u32 = draw.lucky_number.as_str().parse().unwrap();
            assert!((LUCKY_NUMBER_MIN..=LUCKY_NUMBER_MAX).contains(&value));
            assert!(TicketTemplate::ALL.contains(&draw.template));
            assert!(TicketMessage::ALL.contains(&draw.message));
        }
    }

    #[test]
    fn test_draw_covers_every_template_and_message() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut templates = HashSet::new();
        let mut messages = HashSet::new();
        for _ in 0..500 {
            let draw = TicketDraw::random(&mut rng);
            templates.insert(draw.template);
            messages.insert(draw.message);
        }
        assert_eq!(templates.len(), TicketTemplate::ALL.len());
        assert_eq!(messages.len(), TicketMessage::ALL.len());
    }

    #[test]
    fn test_different_seeds_share_invariants() {
        let a = TicketDraw::random(&mut StdRng::seed_from_u64(1));
        let b = TicketDraw::random(&mut StdRng::seed_from_u64(2));
        for draw in [a, b] {
            assert_eq!(draw.lucky_number.as_str().len(), 6);
        }
    }

    #[test]
    fn test_compose_is_deterministic() {
        let composer = TicketComposer::new("/templates");
        let result = CompositionResult::remote(ImageRef::local("/data/composed/x.png"), "job-1");
        let number = LuckyNumber::from_value(321_654).unwrap();

        let first = composer.compose(
            &request(),
            &result,
            TicketTemplate::Sakura,
            &number,
            TicketMessage::LuckFollows,
        );
        let second = composer.compose(
            &request(),
            &result,
            TicketTemplate::Sakura,
            &number,
            TicketMessage::LuckFollows,
        );

        assert_eq!(first, second);
        assert!(first.composed);
        assert_eq!(first.photo, ImageRef::local("/data/composed/x.png"));
        assert_eq!(first.aspect_ratio, 2.0);
    }

    #[test]
    fn test_compose_marks_fallback() {
        let composer = TicketComposer::new("/templates");
        let source = ImageRef::local("/data/sources/a.png");
        let result = CompositionResult::fallback(source.clone(), "no credential");

        let view = composer.compose(
            &request(),
            &result,
            TicketTemplate::Golden,
            &LuckyNumber::from_value(111_111).unwrap(),
            TicketMessage::BrightDays,
        );

        assert!(!view.composed);
        assert_eq!(view.photo, source);
    }

    #[test]
    fn test_template_image_path() {
        let composer = TicketComposer::new("/templates");
        assert_eq!(
            composer.template_image(TicketTemplate::FortuneCat),
            ImageRef::local("/templates/fortune_cat.png")
        );
    }
}
