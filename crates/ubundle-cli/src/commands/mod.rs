//! Command handlers

pub mod extract;
pub mod info;

use anyhow::Context;
use tracing::debug;
use ubundle_formats::bundle::BundleFile;

use crate::BundleArgs;

/// Open the bundle named by `args`, decrypting with its key if given
pub(crate) fn open_bundle(args: &BundleArgs) -> anyhow::Result<BundleFile> {
    debug!(path = %args.bundle.display(), keyed = args.key.is_some(), "opening bundle");
    BundleFile::open(&args.bundle, args.key.as_deref())
        .with_context(|| format!("failed to read bundle {}", args.bundle.display()))
}
