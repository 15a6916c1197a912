use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;

use super::*;
use crate::foundation::error::CompositeErrorKind;

#[derive(Clone, Debug, PartialEq)]
enum Call {
    Decode(String),
    Allocate(ImageSize),
    Draw {
        src: ImageSize,
        dest: Rect,
        opacity: f32,
    },
    Encode(ImageSize),
}

/// Records calls and serves solid rasters of preset sizes.
#[derive(Default)]
struct FakeBackend {
    images: HashMap<String, ImageSize>,
    fail_allocate: bool,
    fail_encode: bool,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    fn with_image(mut self, name: &str, size: ImageSize) -> Self {
        self.images.insert(name.to_string(), size);
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RasterBackend for FakeBackend {
    async fn decode(&self, reference: &ImageRef) -> anyhow::Result<Raster> {
        let name = reference.describe();
        self.record(Call::Decode(name.clone()));
        let size = self
            .images
            .get(&name)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no such image '{name}'"))?;
        Ok(Raster::new_transparent(size.width, size.height)?)
    }

    fn allocate(&self, size: ImageSize) -> CompositeResult<Raster> {
        self.record(Call::Allocate(size));
        if self.fail_allocate {
            return Err(CompositeError::canvas_unavailable("no surface"));
        }
        Raster::new_transparent(size.width, size.height)
    }

    fn draw(
        &self,
        _dst: &mut Raster,
        src: &Raster,
        dest: Rect,
        opacity: f32,
    ) -> CompositeResult<()> {
        self.record(Call::Draw {
            src: src.size(),
            dest,
            opacity,
        });
        Ok(())
    }

    fn encode_png(&self, raster: &Raster) -> anyhow::Result<Vec<u8>> {
        self.record(Call::Encode(raster.size()));
        if self.fail_encode {
            anyhow::bail!("encoder exploded");
        }
        Ok(vec![1, 2, 3])
    }
}

fn r(name: &str) -> ImageRef {
    ImageRef::Url(name.to_string())
}

#[tokio::test]
async fn pipeline_runs_base_stage_before_logo_stage() {
    let fake = FakeBackend::default()
        .with_image("base", ImageSize::new(1000, 800))
        .with_image("logo", ImageSize::new(200, 100));
    let compositor = Compositor::new(fake);

    let out = compositor.composite(&r("base"), &r("logo")).await.unwrap();
    assert_eq!(out.size(), ImageSize::new(1000, 800));
    assert_eq!(out.png, vec![1, 2, 3]);

    assert_eq!(
        compositor.backend().calls(),
        vec![
            Call::Decode("base".to_string()),
            Call::Allocate(ImageSize::new(1000, 800)),
            Call::Draw {
                src: ImageSize::new(1000, 800),
                dest: Rect::new(0.0, 0.0, 1000.0, 800.0),
                opacity: 1.0,
            },
            Call::Decode("logo".to_string()),
            Call::Draw {
                src: ImageSize::new(200, 100),
                dest: Rect::new(840.0, 700.0, 960.0, 760.0),
                opacity: 0.9,
            },
            Call::Encode(ImageSize::new(1000, 800)),
        ]
    );
}

#[tokio::test]
async fn logo_failure_reports_logo_after_base_was_decoded() {
    let fake = FakeBackend::default().with_image("base", ImageSize::new(64, 64));
    let compositor = Compositor::new(fake);

    let err = compositor
        .composite(&r("base"), &r("missing"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CompositeErrorKind::Decode);
    assert_eq!(err.role(), Some(ImageRole::Logo));

    let calls = compositor.backend().calls();
    assert_eq!(calls[0], Call::Decode("base".to_string()));
    assert!(calls.contains(&Call::Decode("missing".to_string())));
    assert!(!calls.iter().any(|c| matches!(c, Call::Encode(_))));
}

#[tokio::test]
async fn base_failure_never_touches_logo() {
    let fake = FakeBackend::default().with_image("logo", ImageSize::new(8, 8));
    let compositor = Compositor::new(fake);

    let err = compositor
        .composite(&r("nope"), &r("logo"))
        .await
        .unwrap_err();
    assert_eq!(err.role(), Some(ImageRole::Base));
    assert_eq!(
        compositor.backend().calls(),
        vec![Call::Decode("nope".to_string())]
    );
}

#[tokio::test]
async fn canvas_unavailable_is_surfaced() {
    let fake = FakeBackend {
        fail_allocate: true,
        ..FakeBackend::default()
    }
    .with_image("base", ImageSize::new(8, 8))
    .with_image("logo", ImageSize::new(2, 2));
    let compositor = Compositor::new(fake);

    let err = compositor
        .composite(&r("base"), &r("logo"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CompositeErrorKind::CanvasUnavailable);
    assert!(
        !compositor
            .backend()
            .calls()
            .contains(&Call::Decode("logo".to_string()))
    );
}

#[tokio::test]
async fn encode_failure_is_an_encode_error() {
    let fake = FakeBackend {
        fail_encode: true,
        ..FakeBackend::default()
    }
    .with_image("base", ImageSize::new(8, 8))
    .with_image("logo", ImageSize::new(2, 2));
    let compositor = Compositor::new(fake);

    let err = compositor
        .composite(&r("base"), &r("logo"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CompositeErrorKind::Encode);
    assert!(err.to_string().contains("encoder exploded"));
}

#[tokio::test]
async fn empty_decoded_logo_is_a_logo_decode_error() {
    let fake = FakeBackend::default()
        .with_image("base", ImageSize::new(8, 8))
        .with_image("logo", ImageSize::new(0, 4));
    let compositor = Compositor::new(fake);

    let err = compositor
        .composite(&r("base"), &r("logo"))
        .await
        .unwrap_err();
    assert_eq!(err.role(), Some(ImageRole::Logo));
}

#[tokio::test]
async fn unparseable_reference_maps_to_its_role() {
    let compositor = Compositor::new(FakeBackend::default());
    let err = compositor
        .composite_refs("data:image/png;base64,@@@", "logo.png")
        .await
        .unwrap_err();
    assert_eq!(err.role(), Some(ImageRole::Base));

    let err = compositor
        .composite_refs("base.png", "gopher://x/y")
        .await
        .unwrap_err();
    assert_eq!(err.role(), Some(ImageRole::Logo));
}

#[test]
fn with_policy_validates() {
    let bad = WatermarkPolicy {
        opacity: -1.0,
        ..WatermarkPolicy::default()
    };
    assert!(Compositor::with_policy(FakeBackend::default(), bad).is_err());

    let custom = WatermarkPolicy {
        scale_factor: 0.25,
        padding: 0.0,
        opacity: 1.0,
    };
    let c = Compositor::with_policy(FakeBackend::default(), custom).unwrap();
    let p = c
        .plan(ImageSize::new(400, 200), ImageSize::new(10, 10))
        .unwrap();
    assert_eq!(p.rect, Rect::new(350.0, 150.0, 400.0, 200.0));
}

#[test]
fn output_data_uri_is_png() {
    let out = CompositeOutput {
        width: 1,
        height: 1,
        png: vec![0x89, b'P', b'N', b'G'],
        placement: place_logo(
            ImageSize::new(10, 10),
            ImageSize::new(1, 1),
            &WatermarkPolicy::default(),
        )
        .unwrap(),
    };
    assert_eq!(out.to_data_uri_string(), "data:image/png;base64,iVBORw==");
}
