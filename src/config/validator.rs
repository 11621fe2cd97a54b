//! Config validation.

use super::{CommandTemplates, DeployConfig, FlashSettings, ImageGeometry, PathSettings};
use crate::error::ConfigError;
use regex::Regex;
use std::path::{Component, Path};

/// Placeholders the pipeline knows how to fill in.
pub const KNOWN_PLACEHOLDERS: &[&str] = &[
    "build_dir",
    "header",
    "tool",
    "data_dir",
    "page_size",
    "block_size",
    "image_size",
    "image",
    "fqbn_compile",
    "fqbn_upload",
    "sketch",
    "port",
    "baud",
    "address",
];

/// Validate the whole configuration.
pub fn validate_config(config: &DeployConfig) -> Result<(), ConfigError> {
    validate_image_geometry(&config.image)?;
    validate_flash_settings(&config.flash)?;
    validate_command_templates(&config.commands)?;
    validate_path_settings(&config.paths)?;

    if config.paths.tool_pattern.trim().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Tool name pattern cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validate the workspace layout.
///
/// Every path the cleaner deletes must stay inside the workspace: relative,
/// non-empty and made of plain names only (no `..`, no `.`).
pub fn validate_path_settings(paths: &PathSettings) -> Result<(), ConfigError> {
    let workspace_paths = [
        ("build_dir", paths.build_dir.as_path()),
        ("public_index", paths.public_index.as_path()),
        ("sketch_dir", paths.sketch_dir.as_path()),
        ("progmem_sketch_dir", paths.progmem_sketch_dir.as_path()),
        ("header_file", paths.header_file.as_path()),
        ("image_file", paths.image_file.as_path()),
    ];
    for (field, path) in workspace_paths {
        validate_workspace_path(field, path)?;
    }

    if paths.data_subdir.trim().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Staging directory name cannot be empty".to_string(),
        ));
    }
    let data_subdir = Path::new(&paths.data_subdir);
    validate_workspace_path("data_subdir", data_subdir)?;
    if data_subdir.components().count() != 1 {
        return Err(ConfigError::ValidationFailed(format!(
            "data_subdir must be a single directory name, got: {}",
            paths.data_subdir
        )));
    }

    Ok(())
}

fn validate_workspace_path(field: &str, path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(format!(
            "{} cannot be empty",
            field
        )));
    }

    let plain = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !plain {
        return Err(ConfigError::ValidationFailed(format!(
            "{} must be a relative path inside the workspace without '.' or '..', got: {}",
            field,
            path.display()
        )));
    }

    Ok(())
}

/// Validate SPIFFS geometry (page | block | image, page a power of two).
pub fn validate_image_geometry(image: &ImageGeometry) -> Result<(), ConfigError> {
    if image.page_size == 0 || !image.page_size.is_power_of_two() {
        return Err(ConfigError::ValidationFailed(format!(
            "Page size must be a power of two, got: {}",
            image.page_size
        )));
    }

    if image.block_size == 0 || image.block_size % image.page_size != 0 {
        return Err(ConfigError::ValidationFailed(format!(
            "Block size {} must be a non-zero multiple of page size {}",
            image.block_size, image.page_size
        )));
    }

    if image.image_size == 0 || image.image_size % image.block_size != 0 {
        return Err(ConfigError::ValidationFailed(format!(
            "Image size {} must be a non-zero multiple of block size {}",
            image.image_size, image.block_size
        )));
    }

    Ok(())
}

/// Validate baud rate, flash address and board identifiers.
pub fn validate_flash_settings(flash: &FlashSettings) -> Result<(), ConfigError> {
    if flash.baud == 0 {
        return Err(ConfigError::ValidationFailed(
            "Baud rate must be greater than zero".to_string(),
        ));
    }

    parse_flash_address(&flash.address)?;

    for (name, fqbn) in [("compile", &flash.fqbn_compile), ("upload", &flash.fqbn_upload)] {
        if fqbn.split(':').count() < 3 {
            return Err(ConfigError::ValidationFailed(format!(
                "Board identifier for {} must look like vendor:arch:board, got: {}",
                name, fqbn
            )));
        }
    }

    Ok(())
}

/// Parse a `0x`-prefixed hexadecimal flash address.
pub fn parse_flash_address(address: &str) -> Result<u32, ConfigError> {
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| {
            ConfigError::ValidationFailed(format!(
                "Flash address must be hexadecimal with 0x prefix, got: {}",
                address
            ))
        })?;

    u32::from_str_radix(digits, 16).map_err(|_| {
        ConfigError::ValidationFailed(format!("Flash address is not valid hex: {}", address))
    })
}

/// Validate that every template is non-empty and only uses known placeholders.
pub fn validate_command_templates(commands: &CommandTemplates) -> Result<(), ConfigError> {
    let placeholder = Regex::new(r"\{([^{}]*)\}")
        .map_err(|e| ConfigError::ValidationFailed(format!("Invalid placeholder regex: {}", e)))?;

    let templates = [
        ("bundler", &commands.bundler),
        ("header_generator", &commands.header_generator),
        ("config_dump", &commands.config_dump),
        ("image_builder", &commands.image_builder),
        ("compile", &commands.compile),
        ("flash_image", &commands.flash_image),
        ("flash_firmware", &commands.flash_firmware),
    ];

    for (name, template) in templates {
        if template.split_whitespace().next().is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "Command template '{}' cannot be empty",
                name
            )));
        }

        for capture in placeholder.captures_iter(template) {
            let key = &capture[1];
            if !KNOWN_PLACEHOLDERS.contains(&key) {
                return Err(ConfigError::ValidationFailed(format!(
                    "Command template '{}' uses unknown placeholder {{{}}}",
                    name, key
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&DeployConfig::default()).is_ok());
    }

    #[test]
    fn test_page_size_power_of_two() {
        let image = ImageGeometry {
            page_size: 300,
            ..ImageGeometry::default()
        };
        assert!(validate_image_geometry(&image).is_err());
    }

    #[test]
    fn test_block_must_be_page_multiple() {
        let image = ImageGeometry {
            page_size: 256,
            block_size: 1000,
            image_size: 1_048_576,
        };
        assert!(validate_image_geometry(&image).is_err());
    }

    #[test]
    fn test_image_must_be_block_multiple() {
        let image = ImageGeometry {
            image_size: 1_000_000,
            ..ImageGeometry::default()
        };
        assert!(validate_image_geometry(&image).is_err());
    }

    #[test]
    fn test_parse_flash_address() {
        assert_eq!(parse_flash_address("0x300000").ok(), Some(0x30_0000));
        assert!(parse_flash_address("300000").is_err());
        assert!(parse_flash_address("0xZZ").is_err());
    }

    #[test]
    fn test_zero_baud_rejected() {
        let flash = FlashSettings {
            baud: 0,
            ..FlashSettings::default()
        };
        assert!(validate_flash_settings(&flash).is_err());
    }

    #[test]
    fn test_bad_fqbn_rejected() {
        let flash = FlashSettings {
            fqbn_upload: "nodemcuv2".to_string(),
            ..FlashSettings::default()
        };
        assert!(validate_flash_settings(&flash).is_err());
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let commands = CommandTemplates {
            compile: "arduino-cli compile -b {board} {sketch}".to_string(),
            ..CommandTemplates::default()
        };
        let err = validate_command_templates(&commands).expect_err("unknown placeholder");
        assert!(err.to_string().contains("{board}"));
    }

    #[test]
    fn test_empty_template_rejected() {
        let commands = CommandTemplates {
            bundler: "   ".to_string(),
            ..CommandTemplates::default()
        };
        assert!(validate_command_templates(&commands).is_err());
    }

    #[test]
    fn test_parent_data_subdir_rejected() {
        let mut config = DeployConfig::default();
        config.paths.data_subdir = "..".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationFailed(_))
        ));

        config.paths.data_subdir = "data/cache".to_string();
        assert!(validate_path_settings(&config.paths).is_err());

        config.paths.data_subdir = "  ".to_string();
        assert!(validate_path_settings(&config.paths).is_err());
    }

    #[test]
    fn test_absolute_build_dir_rejected() {
        let mut config = DeployConfig::default();
        config.paths.build_dir = "/home/dev".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_escaping_paths_rejected() {
        let mut paths = PathSettings::default();
        paths.sketch_dir = "../firmware".into();
        assert!(validate_path_settings(&paths).is_err());

        let mut paths = PathSettings::default();
        paths.header_file = "esp8266_progmem/../../web_data.h".into();
        assert!(validate_path_settings(&paths).is_err());

        let mut paths = PathSettings::default();
        paths.image_file = ".".into();
        assert!(validate_path_settings(&paths).is_err());

        let mut paths = PathSettings::default();
        paths.build_dir = "".into();
        assert!(validate_path_settings(&paths).is_err());
    }

    #[test]
    fn test_nested_relative_paths_accepted() {
        let mut paths = PathSettings::default();
        paths.build_dir = "web/dist".into();
        paths.image_file = "out/fs.bin".into();
        assert!(validate_path_settings(&paths).is_ok());
    }
}
