//! Output filename templates.
//!
//! Supported placeholders: `{original}`, `{index}`, `{timestamp}`, `{width}`, `{height}`,
//! `{csv_name}` and `{ext}`. Each placeholder is replaced at its first occurrence only;
//! repeated placeholders are left verbatim.

use std::time::{SystemTime, UNIX_EPOCH};

/// Template used when none is configured.
pub const DEFAULT_TEMPLATE: &str = "{original}_face_{index}";

/// Values substituted into a filename template.
#[derive(Debug, Clone)]
pub struct NamingContext<'a> {
    /// Source file stem.
    pub original: &'a str,
    /// 1-based face index within the source image.
    pub index: usize,
    /// Unix time in milliseconds.
    pub timestamp_millis: u128,
    pub width: u32,
    pub height: u32,
    /// Externally supplied name; `{original}` is used when absent.
    pub csv_name: Option<&'a str>,
    /// Extension without the leading dot.
    pub ext: &'a str,
}

/// Current Unix time in milliseconds, or 0 if the clock is before the epoch.
pub fn unix_timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Render `template` into a filename.
///
/// The extension is appended when the template has no `{ext}`. Path separators in the
/// result become `_` so the name cannot escape the output directory.
pub fn render_filename(template: &str, ctx: &NamingContext<'_>) -> String {
    let template = if template.trim().is_empty() {
        DEFAULT_TEMPLATE
    } else {
        template
    };
    let csv_name = ctx
        .csv_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(ctx.original);

    let replacements = [
        ("{original}", ctx.original.to_string()),
        ("{index}", ctx.index.to_string()),
        ("{timestamp}", ctx.timestamp_millis.to_string()),
        ("{width}", ctx.width.to_string()),
        ("{height}", ctx.height.to_string()),
        ("{csv_name}", csv_name.to_string()),
    ];

    let has_ext = template.contains("{ext}");
    let mut name = template.to_string();
    for (placeholder, value) in &replacements {
        name = name.replacen(placeholder, value, 1);
    }
    if has_ext {
        name = name.replacen("{ext}", ctx.ext, 1);
    }

    let mut name = name.replace(['/', '\\'], "_");
    if !has_ext && !ctx.ext.is_empty() {
        name.push('.');
        name.push_str(ctx.ext);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> NamingContext<'static> {
        NamingContext {
            original: "portrait",
            index: 2,
            timestamp_millis: 1_700_000_000_123,
            width: 400,
            height: 500,
            csv_name: None,
            ext: "png",
        }
    }

    #[test]
    fn default_template_appends_extension() {
        assert_eq!(render_filename(DEFAULT_TEMPLATE, &ctx()), "portrait_face_2.png");
        assert_eq!(render_filename("   ", &ctx()), "portrait_face_2.png");
    }

    #[test]
    fn all_placeholders_substitute() {
        let name = render_filename("{original}-{index}-{width}x{height}-{timestamp}", &ctx());
        assert_eq!(name, "portrait-2-400x500-1700000000123.png");
    }

    #[test]
    fn explicit_ext_is_not_duplicated() {
        assert_eq!(render_filename("{original}.{ext}", &ctx()), "portrait.png");
    }

    #[test]
    fn only_first_occurrence_is_replaced() {
        assert_eq!(
            render_filename("{index}_{index}", &ctx()),
            "2_{index}.png"
        );
    }

    #[test]
    fn csv_name_falls_back_to_original() {
        assert_eq!(render_filename("{csv_name}", &ctx()), "portrait.png");
        let named = NamingContext {
            csv_name: Some("Jane Doe"),
            ..ctx()
        };
        assert_eq!(render_filename("{csv_name}", &named), "Jane Doe.png");
    }

    #[test]
    fn path_separators_are_replaced() {
        let named = NamingContext {
            csv_name: Some("../etc\\passwd"),
            ..ctx()
        };
        assert_eq!(render_filename("{csv_name}", &named), ".._etc_passwd.png");
    }
}
