//! Lens Distortion - Command Line Entry Point
//!
//! Applies the fisheye transform to a rectilinear image on the CPU, or on the
//! GPU with `--gpu`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::Parser;
use image::RgbaImage;

use lens_distortion::camera::LensProjection;
use lens_distortion::effects::builtin::{self, LENS_DISTORTION};
use lens_distortion::effects::{EffectParams, EffectProcessor, EffectRegistry};
use lens_distortion::gpu_context::{GpuContext, GpuError, OFFSCREEN_FORMAT};
use lens_distortion::offscreen::render_offscreen;
use lens_distortion::sampling::{AddressMode, FilterMode};
use lens_distortion::settings::LensSettings;
use lens_distortion::shaders::load_shader;
use lens_distortion::telemetry::{init_logging, LogConfig};

#[derive(Parser, Debug)]
#[command(name = "lens-distortion", version)]
#[command(about = "Bend a rectilinear render into a stereographic / cylindrical fisheye")]
struct Args {
    /// Rectilinear source image.
    #[arg(required_unless_present = "list_effects")]
    input: Option<PathBuf>,

    /// Where to write the distorted image.
    #[arg(required_unless_present = "list_effects")]
    output: Option<PathBuf>,

    /// Load lens settings from a `.lens` file instead of the user defaults.
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Horizontal field of view in degrees (1-179).
    #[arg(long = "fov", value_name = "DEGREES", value_parser = parse_fov)]
    horizontal_fov: Option<f32>,

    /// 0 = rectilinear, 1 = stereographic.
    #[arg(long, value_parser = parse_strength)]
    strength: Option<f32>,

    /// 0 = cylindrical, 1 = spherical. Other values extrapolate.
    #[arg(long = "cylindrical", value_name = "RATIO", value_parser = parse_finite)]
    cylindrical_ratio: Option<f32>,

    /// What lies outside the source image.
    #[arg(long = "address", value_name = "MODE", value_parser = address_mode_parser())]
    address_mode: Option<AddressMode>,

    /// Texture filter.
    #[arg(long, value_parser = filter_parser())]
    filter: Option<FilterMode>,

    /// Render with wgpu, falling back to the CPU if no device is available.
    #[arg(long)]
    gpu: bool,

    /// Replacement WGSL lens shader.
    #[arg(long, value_name = "FILE", requires = "gpu")]
    shader: Option<PathBuf>,

    /// Write the effective settings to a `.lens` file.
    #[arg(long, value_name = "FILE")]
    save_settings: Option<PathBuf>,

    /// Also log to a file.
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// List registered effects, optionally filtered by a search term.
    #[arg(long, value_name = "QUERY", num_args = 0..=1, default_missing_value = "")]
    list_effects: Option<String>,
}

fn parse_finite(value: &str) -> Result<f32, String> {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("expected a number, got '{}'", value))
}

fn parse_fov(value: &str) -> Result<f32, String> {
    let fov = parse_finite(value)?;
    if (1.0..=179.0).contains(&fov) {
        Ok(fov)
    } else {
        Err(format!("{} is outside 1-179 degrees", fov))
    }
}

fn parse_strength(value: &str) -> Result<f32, String> {
    let strength = parse_finite(value)?;
    if (0.0..=1.0).contains(&strength) {
        Ok(strength)
    } else {
        Err(format!("{} is outside 0-1", strength))
    }
}

fn address_mode_parser() -> impl TypedValueParser<Value = AddressMode> {
    PossibleValuesParser::new(AddressMode::ALL.map(|mode| mode.name()))
        .map(|name| AddressMode::from_name(&name).unwrap_or_default())
}

fn filter_parser() -> impl TypedValueParser<Value = FilterMode> {
    PossibleValuesParser::new(FilterMode::ALL.map(|mode| mode.name()))
        .map(|name| FilterMode::from_name(&name).unwrap_or_default())
}

/// Settings file (or user defaults) with command line overrides applied
fn effective_settings(args: &Args) -> Result<LensSettings, Box<dyn std::error::Error>> {
    let mut settings = match &args.settings {
        Some(path) => LensSettings::load_from_file(path)?,
        None => LensSettings::load(),
    };

    if let Some(fov) = args.horizontal_fov {
        settings.horizontal_fov_degrees = fov;
    }
    if let Some(strength) = args.strength {
        settings.strength = strength;
    }
    if let Some(ratio) = args.cylindrical_ratio {
        settings.cylindrical_ratio = ratio;
    }
    if let Some(mode) = args.address_mode {
        settings.address_mode = mode;
    }
    if let Some(filter) = args.filter {
        settings.filter = filter;
    }
    settings.clamp();
    Ok(settings)
}

/// One line per effect, plus its parameters; every effect when `query` is empty
fn effect_listing(registry: &EffectRegistry, query: &str) -> Vec<String> {
    let definitions = if query.is_empty() {
        registry
            .categories()
            .into_iter()
            .flat_map(|category| registry.effects_in_category(category))
            .collect()
    } else {
        registry.search(query)
    };

    let mut lines = Vec::new();
    for definition in definitions {
        let processor = match registry.processor(definition.effect_type()) {
            Some(EffectProcessor::Gpu) => "gpu",
            Some(EffectProcessor::Cpu) | None => "cpu",
        };
        lines.push(format!(
            "{}/{}  {} [{}]",
            definition.category(),
            definition.effect_type(),
            definition.display_name(),
            processor
        ));
        for param in definition.default_parameters() {
            lines.push(format!("    {:<20} {}", param.meta.name, param.meta.label));
        }
    }
    lines
}

fn render_cpu(
    registry: &EffectRegistry,
    image: &RgbaImage,
    params: &EffectParams,
) -> Result<RgbaImage, Box<dyn std::error::Error>> {
    let mut runtime = registry
        .create_cpu_runtime(LENS_DISTORTION)
        .ok_or("Lens distortion has no CPU runtime")?;

    let (width, height) = image.dimensions();
    let mut pixels = vec![0u8; image.as_raw().len()];
    runtime.process(image.as_raw(), &mut pixels, width, height, params);
    Ok(RgbaImage::from_raw(width, height, pixels).ok_or("Output buffer size mismatch")?)
}

fn render_gpu(
    registry: &EffectRegistry,
    image: &RgbaImage,
    params: &EffectParams,
    shader_source: Option<&str>,
) -> Result<RgbaImage, GpuError> {
    let ctx = pollster::block_on(GpuContext::new_headless())?;
    let mut runtime = registry
        .create_gpu_runtime(LENS_DISTORTION, &ctx.device, &ctx.queue, OFFSCREEN_FORMAT)
        .ok_or_else(|| GpuError::NoRuntime(LENS_DISTORTION.to_string()))?;

    if let Some(source) = shader_source {
        runtime.rebuild(&ctx.device, source).map_err(GpuError::ShaderRebuild)?;
    }

    render_offscreen(&ctx, runtime.as_mut(), image, params)
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = EffectRegistry::new();
    builtin::register_builtin_effects(&mut registry);

    if let Some(query) = &args.list_effects {
        for line in effect_listing(&registry, query) {
            println!("{}", line);
        }
        return Ok(());
    }

    let (Some(input), Some(output_path)) = (&args.input, &args.output) else {
        return Err("Expected <INPUT> and <OUTPUT>".into());
    };

    let settings = effective_settings(args)?;
    if let Some(path) = &args.save_settings {
        settings.save_to_file(path)?;
        tracing::info!("Saved settings to {}", path.display());
    }

    // An explicitly requested shader must exist
    let shader_source = match &args.shader {
        Some(path) => Some(
            load_shader(path).map_err(|e| format!("Failed to read shader {}: {}", path.display(), e))?,
        ),
        None => None,
    };

    let image = image::open(input)?.to_rgba8();
    let (width, height) = image.dimensions();
    tracing::info!("Loaded {} ({}x{})", input.display(), width, height);

    let projection = LensProjection::new(settings.dial(), width, height)?;
    tracing::info!(
        horizontal_fov = settings.horizontal_fov_degrees,
        strength = settings.strength,
        cylindrical_ratio = settings.cylindrical_ratio,
        "Source should be rendered with a vertical FOV of {:.2}°",
        projection.vertical_fov_degrees()
    );

    let mut instance = registry
        .create_instance(LENS_DISTORTION)
        .ok_or("Lens distortion is not registered")?;
    builtin::configure_lens_instance(&mut instance, &settings);
    let params = EffectParams::from_parameters(&instance.parameters);

    let output = if args.gpu {
        match render_gpu(&registry, &image, &params, shader_source.as_deref()) {
            Ok(output) => output,
            Err(e @ GpuError::ShaderRebuild(_)) => return Err(e.into()),
            Err(e) => {
                tracing::warn!("GPU render failed ({}), using CPU", e);
                render_cpu(&registry, &image, &params)?
            }
        }
    } else {
        render_cpu(&registry, &image, &params)?
    };

    output.save(output_path)?;
    tracing::info!("Wrote {}", output_path.display());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_config = LogConfig {
        file_path: args.log_file.clone(),
        ..LogConfig::default()
    };
    // Keep the guard alive for the program duration
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("lens-distortion").chain(list.iter().copied()))
    }

    #[test]
    fn test_command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_minimal() {
        let args = parse(&["in.png", "out.png"]).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("in.png")));
        assert_eq!(args.output, Some(PathBuf::from("out.png")));
        assert!(!args.gpu);
        assert!(args.strength.is_none());
        assert!(args.list_effects.is_none());
    }

    #[test]
    fn test_parse_options() {
        let args = parse(&[
            "--fov", "120", "in.png", "--strength", "0.5", "--address", "mirror", "--filter", "nearest", "--gpu",
            "--shader", "lens.wgsl", "out.png",
        ])
        .unwrap();
        assert_eq!(args.horizontal_fov, Some(120.0));
        assert_eq!(args.strength, Some(0.5));
        assert_eq!(args.address_mode, Some(AddressMode::MirrorRepeat));
        assert_eq!(args.filter, Some(FilterMode::Nearest));
        assert!(args.gpu);
        assert_eq!(args.shader, Some(PathBuf::from("lens.wgsl")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&["in.png"]).is_err());
        assert!(parse(&["a", "b", "c"]).is_err());
        assert!(parse(&["a", "b", "--fov"]).is_err());
        assert!(parse(&["a", "b", "--fov", "wide"]).is_err());
        assert!(parse(&["a", "b", "--fov", "180"]).is_err());
        assert!(parse(&["a", "b", "--strength", "NaN"]).is_err());
        assert!(parse(&["a", "b", "--strength", "1.5"]).is_err());
        assert!(parse(&["a", "b", "--cylindrical", "inf"]).is_err());
        assert!(parse(&["a", "b", "--address", "wrap"]).is_err());
        assert!(parse(&["a", "b", "--bogus", "1"]).is_err());
        // A replacement shader only makes sense on the GPU
        assert!(parse(&["a", "b", "--shader", "lens.wgsl"]).is_err());
    }

    #[test]
    fn test_list_effects_needs_no_paths() {
        let args = parse(&["--list-effects"]).unwrap();
        assert_eq!(args.list_effects.as_deref(), Some(""));
        let args = parse(&["--list-effects", "distort"]).unwrap();
        assert_eq!(args.list_effects.as_deref(), Some("distort"));
        assert!(args.input.is_none());
    }

    #[test]
    fn test_effect_listing() {
        let mut registry = EffectRegistry::new();
        builtin::register_builtin_effects(&mut registry);

        let all = effect_listing(&registry, "");
        assert_eq!(all[0], "Distort/lens_distortion  Lens Distortion [gpu]");
        assert!(all.iter().any(|line| line.contains("cylindrical_ratio")));
        assert_eq!(effect_listing(&registry, "LENS"), all);
        assert!(effect_listing(&registry, "blur").is_empty());
    }

    #[test]
    fn test_missing_shader_is_an_error() {
        let dir = std::env::temp_dir();
        let args = parse(&[
            dir.join("missing-input.png").to_str().unwrap(),
            dir.join("unused-output.png").to_str().unwrap(),
            "--gpu",
            "--shader",
            "/nonexistent/lens.wgsl",
            "--settings",
            "/nonexistent/settings.lens",
        ])
        .unwrap();
        // Settings fail first; drop them to reach the shader
        assert!(run(&args).is_err());

        let args = Args { settings: None, ..args };
        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("Failed to read shader"), "{}", err);
    }

    #[test]
    fn test_overrides_are_clamped() {
        let path = std::env::temp_dir().join(format!("lens-cli-{}.lens", std::process::id()));
        LensSettings::default().save_to_file(&path).unwrap();

        let mut args = parse(&["in.png", "out.png", "--cylindrical", "2", "--filter", "nearest"]).unwrap();
        args.settings = Some(path.clone());
        args.horizontal_fov = Some(400.0);
        let settings = effective_settings(&args).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(settings.horizontal_fov_degrees, 179.0);
        assert_eq!(settings.cylindrical_ratio, 2.0);
        assert_eq!(settings.filter, FilterMode::Nearest);
        assert_eq!(settings.strength, 1.0);
    }
}
