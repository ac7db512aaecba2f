//! Embeds a build stamp and the cargo profile for `shadenet --version`.
//!
//! `SOURCE_DATE_EPOCH` pins the stamp for reproducible builds.

use time::OffsetDateTime;

const STAMP_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second] UTC";

fn build_instant() -> OffsetDateTime {
    std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .unwrap_or_else(OffsetDateTime::now_utc)
}

fn main() {
    let stamp = time::format_description::parse(STAMP_FORMAT)
        .ok()
        .and_then(|fmt| build_instant().format(&fmt).ok())
        .unwrap_or_else(|| "unknown".to_string());
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=SHADENET_BUILD_STAMP={stamp}");
    println!("cargo:rustc-env=SHADENET_BUILD_PROFILE={profile}");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
}
