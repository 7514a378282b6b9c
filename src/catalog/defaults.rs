//! Built-in target matrix used when shipyard.toml declares no `[[targets]]`

use crate::catalog::target::{PackagingVariant, PlatformFamily, TargetDescriptor};

const CROSS_IMAGE_PREFIX: &str = "ghcr.io/cross-rs";

fn cross_image(triple: &str) -> String {
  format!("{}/{}:main", CROSS_IMAGE_PREFIX, triple)
}

fn linux_archive(triple: &str) -> TargetDescriptor {
  TargetDescriptor::new(PlatformFamily::Linux, triple, PackagingVariant::NativeArchive)
}

fn linux_cross_archive(triple: &str) -> TargetDescriptor {
  linux_archive(triple).cross(Some(&cross_image(triple)))
}

/// The default release matrix
///
/// Native archives for the tier-1/tier-2 targets, one Windows installer, and Debian
/// packages for the three common Linux architectures. Less common architectures are
/// best-effort.
pub fn default_catalog() -> Vec<TargetDescriptor> {
  let mut targets = vec![
    // Linux
    linux_archive("x86_64-unknown-linux-gnu"),
    linux_archive("x86_64-unknown-linux-gnu")
      .cross(Some("ghcr.io/cross-rs/x86_64-unknown-linux-gnu:main-centos"))
      .with_suffix("2-17"),
    linux_cross_archive("i686-unknown-linux-gnu"),
    linux_cross_archive("x86_64-unknown-linux-musl"),
    linux_cross_archive("i686-unknown-linux-musl"),
    linux_cross_archive("aarch64-unknown-linux-gnu"),
    linux_cross_archive("armv7-unknown-linux-gnueabihf"),
    linux_cross_archive("arm-unknown-linux-gnueabihf"),
    linux_cross_archive("aarch64-unknown-linux-musl"),
    linux_cross_archive("powerpc64le-unknown-linux-gnu").best_effort(),
    linux_cross_archive("riscv64gc-unknown-linux-gnu").best_effort(),
    // macOS
    TargetDescriptor::new(PlatformFamily::Macos, "x86_64-apple-darwin", PackagingVariant::NativeArchive),
    TargetDescriptor::new(PlatformFamily::Macos, "aarch64-apple-darwin", PackagingVariant::NativeArchive),
    // Windows
    TargetDescriptor::new(PlatformFamily::Windows, "x86_64-pc-windows-msvc", PackagingVariant::NativeArchive),
    TargetDescriptor::new(PlatformFamily::Windows, "i686-pc-windows-msvc", PackagingVariant::NativeArchive),
    TargetDescriptor::new(PlatformFamily::Windows, "x86_64-pc-windows-gnu", PackagingVariant::NativeArchive),
    // BSD
    TargetDescriptor::new(PlatformFamily::Freebsd, "x86_64-unknown-freebsd", PackagingVariant::NativeArchive)
      .cross(Some(&cross_image("x86_64-unknown-freebsd")))
      .best_effort(),
  ];

  // Installer job class
  targets.push(TargetDescriptor::new(
    PlatformFamily::Windows,
    "x86_64-pc-windows-msvc",
    PackagingVariant::Installer,
  ));

  // Distro packages; non-native architectures are packaged inside an arch-matched container
  targets.push(TargetDescriptor::new(
    PlatformFamily::Linux,
    "x86_64-unknown-linux-gnu",
    PackagingVariant::DistroPackage,
  ));
  targets.push(
    TargetDescriptor::new(PlatformFamily::Linux, "aarch64-unknown-linux-gnu", PackagingVariant::DistroPackage)
      .cross(Some("docker.io/arm64v8/rust:1-bookworm")),
  );
  targets.push(
    TargetDescriptor::new(
      PlatformFamily::Linux,
      "armv7-unknown-linux-gnueabihf",
      PackagingVariant::DistroPackage,
    )
    .cross(Some("docker.io/arm32v7/rust:1-bookworm")),
  );

  targets
}
