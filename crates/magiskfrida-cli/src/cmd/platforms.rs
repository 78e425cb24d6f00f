//! Platforms command

use anyhow::Result;

use magiskfrida_core::BuildConfig;
use magiskfrida_schema::Platform;

use crate::ui::Output;

/// List every supported platform, marking the configured defaults.
pub fn platforms(config: &BuildConfig, output: &Output) -> Result<()> {
    output.section("Platforms");
    for platform in Platform::ALL {
        output.platform_row(
            platform,
            platform.android_abi(),
            config.platforms.contains(&platform),
        );
    }
    Ok(())
}
