use clap::Parser;
use image::{GenericImageView, Rgb, RgbImage};
use magic_mask::{
    config::parse_crop_box, BackgroundColor, Config, CropSelector, MattingModel, ModelVariant,
    SelectionRect,
};
use tempfile::TempDir;

// Mock model defined inside the integration test
#[derive(Debug, Clone)]
struct HalfMaskModel;

impl MattingModel for HalfMaskModel {
    fn predict_mask(&self, image: &RgbImage) -> magic_mask::Result<image::GrayImage> {
        let half = image.width() / 2;
        Ok(image::GrayImage::from_fn(image.width(), image.height(), |x, _| {
            image::Luma([if x < half { 0 } else { 255 }])
        }))
    }

    fn input_size(&self) -> u32 {
        1024
    }
}

#[test]
fn test_config_validation() {
    let config = Config::try_parse_from([
        "magic-mask",
        "input",
        "--model",
        "base",
        "--background",
        "255,255,255",
    ])
    .unwrap();

    assert_eq!(config.model, ModelVariant::Base);
    assert_eq!(config.background, Some(BackgroundColor::new(255, 255, 255)));
    assert_eq!(config.device_id, 0);
    assert!(!config.invert);
    assert!(Config::try_parse_from(["magic-mask", "input", "--model", "huge"]).is_err());
    assert!(Config::try_parse_from(["magic-mask", "input", "-b", "#12"]).is_err());
}

#[test]
fn test_selector_on_real_file_maps_back_to_original() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("large.png");
    RgbImage::from_pixel(1800, 1200, Rgb([10, 20, 30])).save(&path)?;

    let mut selector = CropSelector::open(&path, 600)?;
    assert_eq!(selector.display_size(), (600, 400));

    let preview = selector.preview()?;
    assert_eq!(preview.dimensions(), (600, 400));

    selector.press(300.0, 350.0);
    let rect = selector.release(100.0, 50.0).expect("selection");
    assert_eq!(rect, SelectionRect::new(300, 150, 900, 1050));
    assert!(rect.check_within(1800, 1200).is_ok());
    Ok(())
}

#[test]
fn test_lenient_crop_text() {
    assert_eq!(
        parse_crop_box("0, 0, 64, 32"),
        Some(SelectionRect::new(0, 0, 64, 32))
    );
    assert_eq!(parse_crop_box("0;0;64;32"), None);
}

#[test]
fn test_trait_abstraction() {
    let model = HalfMaskModel;
    assert_eq!(model.input_size(), 1024);

    let test_image = RgbImage::from_pixel(100, 10, Rgb([255, 0, 0]));
    let mask = model.predict_mask(&test_image).unwrap();
    assert_eq!(mask.dimensions(), test_image.dimensions());
    assert_eq!(mask.get_pixel(10, 0)[0], 0);
    assert_eq!(mask.get_pixel(90, 0)[0], 255);

    let boxed: Box<dyn MattingModel> = Box::new(model);
    assert!(boxed.predict_mask(&test_image).is_ok());
}
