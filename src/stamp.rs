//! Version stamping of the host application's metadata files.
//!
//! `About/About.xml` carries the mod name, package id, supported versions and
//! the restricted-dialect description. `About/Manifest.xml` carries the version
//! and update URLs read by mod managers. `AssemblyInfo.cs` carries the assembly
//! versions. All are edited in place with targeted replacements so the rest
//! of the file keeps its formatting.

use crate::domain::Version;
use crate::error::{ReleaseError, Result};
use crate::persist::write_atomic;
use regex::{NoExpand, Regex};
use std::fs;
use std::io::ErrorKind;
use std::ops::Range;
use std::path::Path;

const ABOUT_ROOT: &str = "ModMetaData";
const MANIFEST_ROOT: &str = "Manifest";

/// Values written into `About.xml`
#[derive(Debug, Clone, PartialEq)]
pub struct AboutFields<'a> {
    pub name: &'a str,
    pub package_id: &'a str,
    pub author: &'a str,
    pub description: &'a str,
    pub supported_versions: &'a [String],
}

/// Values written into `Manifest.xml`
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestFields<'a> {
    pub version: &'a str,
    pub manifest_uri: &'a str,
    pub download_uri: &'a str,
}

/// Edits the direct children of a document's root element.
///
/// Nested elements with the same name (a dependency's `packageId`, say) are
/// never touched.
struct RootChildren {
    root: &'static str,
    tags: Regex,
}

impl RootChildren {
    fn of(root: &'static str) -> Result<Self> {
        let tags = Regex::new(
            r"(?s)<!--.*?-->|<!\[CDATA\[.*?\]\]>|<[?!][^>]*>|<(/?)([A-Za-z_][\w.:-]*)(?:\s[^>]*?)?(/?)>",
        )
        .map_err(|e| ReleaseError::parse(e.to_string()))?;
        Ok(RootChildren { root, tags })
    }

    fn close_tag(&self) -> String {
        format!("</{}>", self.root)
    }

    /// Reject a document whose root is not `self.root`.
    fn check(&self, xml: &str) -> Result<()> {
        let first = self
            .tags
            .captures_iter(xml)
            .find_map(|caps| caps.get(2).map(|name| name.as_str()));
        match first {
            Some(name) if name == self.root && xml.contains(&self.close_tag()) => Ok(()),
            _ => Err(ReleaseError::parse(format!(
                "document has no {} root element",
                self.root
            ))),
        }
    }

    /// Byte range of the first `tag` element one level below the root.
    fn find(&self, xml: &str, tag: &str) -> Option<Range<usize>> {
        let mut depth = 0usize;
        let mut start = None;

        for caps in self.tags.captures_iter(xml) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            let empty = caps.get(3).is_some_and(|m| !m.as_str().is_empty());
            let is_target = depth == 1 && name.as_str() == tag;

            if closing {
                depth = depth.saturating_sub(1);
                if depth == 1 && name.as_str() == tag {
                    if let Some(start) = start.take() {
                        return Some(start..whole.end());
                    }
                }
                if depth == 0 {
                    break;
                }
            } else if empty {
                if is_target {
                    return Some(whole.range());
                }
            } else {
                if is_target {
                    start = Some(whole.start());
                }
                depth += 1;
            }
        }
        None
    }

    /// Replace the child element, or append it before the root's closing tag.
    fn set(&self, xml: &str, tag: &str, value: &str) -> Result<String> {
        let element = format!("<{0}>{1}</{0}>", tag, value);
        if let Some(range) = self.find(xml, tag) {
            let mut out = xml.to_string();
            out.replace_range(range, &element);
            return Ok(out);
        }
        let close = self.close_tag();
        let at = xml
            .rfind(&close)
            .ok_or_else(|| ReleaseError::parse(format!("document has no {} root element", self.root)))?;
        Ok(format!("{}  {}\n{}", &xml[..at], element, &xml[at..]))
    }

    /// Drop every such child together with the rest of its line.
    fn remove(&self, xml: &str, tag: &str) -> String {
        let mut out = xml.to_string();
        while let Some(range) = self.find(&out, tag) {
            let bytes = out.as_bytes();
            let mut start = range.start;
            while start > 0 && matches!(bytes[start - 1], b' ' | b'\t') {
                start -= 1;
            }
            let mut end = range.end;
            while end < bytes.len() && matches!(bytes[end], b' ' | b'\t') {
                end += 1;
            }
            if out[end..].starts_with("\r\n") {
                end += 2;
            } else if out[end..].starts_with('\n') {
                end += 1;
            }
            out.replace_range(start..end, "");
        }
        out
    }
}

/// Current file content, `None` when the file does not exist yet.
fn read_existing(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(xml) => Ok(Some(xml)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Rewrite (or create) the metadata file. Returns `true` when it was created.
pub fn stamp_about(path: &Path, fields: &AboutFields<'_>) -> Result<bool> {
    let existing = read_existing(path)?;
    let created = existing.is_none();
    let xml = match existing {
        Some(xml) => update_about(&xml, fields)?,
        None => new_about(fields),
    };
    write_atomic(path, &xml)?;
    tracing::info!(path = %path.display(), created, "stamped mod metadata");
    Ok(created)
}

/// Replace the stamped elements of an existing document.
pub fn update_about(xml: &str, fields: &AboutFields<'_>) -> Result<String> {
    let children = RootChildren::of(ABOUT_ROOT)?;
    children.check(xml)?;

    let mut xml = children.remove(xml, "targetVersion");
    xml = children.set(&xml, "name", &escape_xml(fields.name))?;
    xml = children.set(&xml, "packageId", &escape_xml(fields.package_id))?;
    if !fields.supported_versions.is_empty() {
        xml = children.set(&xml, "supportedVersions", &version_list(fields.supported_versions))?;
    }
    xml = children.set(&xml, "description", &escape_xml(fields.description))?;
    Ok(xml)
}

/// A minimal metadata document.
pub fn new_about(fields: &AboutFields<'_>) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<{root}>\n  <name>{}</name>\n  <packageId>{}</packageId>\n  <author>{}</author>\n  <supportedVersions>{}</supportedVersions>\n  <description>{}</description>\n</{root}>\n",
        escape_xml(fields.name),
        escape_xml(fields.package_id),
        escape_xml(fields.author),
        version_list(fields.supported_versions),
        escape_xml(fields.description),
        root = ABOUT_ROOT
    )
}

/// Rewrite (or create) the update manifest. Returns `true` when it was created.
pub fn stamp_manifest(path: &Path, fields: &ManifestFields<'_>) -> Result<bool> {
    let existing = read_existing(path)?;
    let created = existing.is_none();
    let xml = match existing {
        Some(xml) => update_manifest(&xml, fields)?,
        None => new_manifest(fields),
    };
    write_atomic(path, &xml)?;
    tracing::info!(path = %path.display(), created, version = fields.version, "stamped manifest");
    Ok(created)
}

pub fn update_manifest(xml: &str, fields: &ManifestFields<'_>) -> Result<String> {
    let children = RootChildren::of(MANIFEST_ROOT)?;
    children.check(xml)?;

    let mut xml = children.set(xml, "version", &escape_xml(fields.version))?;
    xml = children.set(&xml, "manifestUri", &escape_xml(fields.manifest_uri))?;
    xml = children.set(&xml, "downloadUri", &escape_xml(fields.download_uri))?;
    Ok(xml)
}

pub fn new_manifest(fields: &ManifestFields<'_>) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<{root}>\n  <version>{}</version>\n  <manifestUri>{}</manifestUri>\n  <downloadUri>{}</downloadUri>\n</{root}>\n",
        escape_xml(fields.version),
        escape_xml(fields.manifest_uri),
        escape_xml(fields.download_uri),
        root = MANIFEST_ROOT
    )
}

fn version_list(versions: &[String]) -> String {
    let items: String = versions
        .iter()
        .map(|v| format!("\n    <li>{}</li>", escape_xml(v)))
        .collect();
    format!("{}\n  ", items)
}

/// Escape text for use as XML character data.
pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// `AssemblyFileVersion` gets the full version, `AssemblyVersion` only the major part.
pub fn stamp_assembly_versions(source: &str, version: &Version) -> Result<String> {
    let file_version = Regex::new(r#"AssemblyFileVersion\(\s?"\d+\.\d+\.\d+(?:\.\d+)?"\s?\)"#)
        .map_err(|e| ReleaseError::parse(e.to_string()))?;
    let assembly_version = Regex::new(r#"AssemblyVersion\(\s?"\d+\.\d+\.\d+(?:\.\d+)?"\s?\)"#)
        .map_err(|e| ReleaseError::parse(e.to_string()))?;

    let full = format!(
        "AssemblyFileVersion(\"{}.{}.{}\")",
        version.major, version.minor, version.build
    );
    let major = format!("AssemblyVersion(\"{}.0.0\")", version.major);

    let stamped = file_version.replace_all(source, NoExpand(&full));
    Ok(assembly_version.replace_all(&stamped, NoExpand(&major)).into_owned())
}

/// Stamp an `AssemblyInfo.cs` file in place.
pub fn update_assembly_info(path: &Path, version: &Version) -> Result<()> {
    let source = fs::read_to_string(path).map_err(|e| {
        ReleaseError::config(format!("cannot read assembly info '{}': {}", path.display(), e))
    })?;
    let stamped = stamp_assembly_versions(&source, version)?;
    write_atomic(path, &stamped)?;
    tracing::info!(path = %path.display(), version = %version, "stamped assembly info");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields<'a>(description: &'a str, versions: &'a [String]) -> AboutFields<'a> {
        AboutFields {
            name: "Colony",
            package_id: "fluffy.colony",
            author: "Fluffy",
            description,
            supported_versions: versions,
        }
    }

    #[test]
    fn test_update_existing_about() {
        let xml = "<?xml version=\"1.0\"?>\n<ModMetaData>\n  <name>Old</name>\n  <targetVersion>1.0</targetVersion>\n  <author>Fluffy</author>\n  <description>old</description>\n</ModMetaData>\n";
        let versions = vec!["1.4".to_string()];
        let out = update_about(xml, &fields("<size=24>Colony</size>\nSalt & pepper\n", &versions)).unwrap();

        assert!(out.contains("<name>Colony</name>"));
        assert!(out.contains("<packageId>fluffy.colony</packageId>"));
        assert!(out.contains("<li>1.4</li>"));
        assert!(out.contains("<author>Fluffy</author>"));
        assert!(!out.contains("targetVersion"));
        assert!(out.contains("<description>&lt;size=24&gt;Colony&lt;/size&gt;\nSalt &amp; pepper\n</description>"));
        assert_eq!(out.matches("<name>").count(), 1);
    }

    #[test]
    fn test_update_rejects_foreign_document() {
        assert!(update_about("<Other/>", &fields("", &[])).is_err());
    }

    #[test]
    fn test_description_with_dollar_signs_kept() {
        let xml = "<ModMetaData>\n<description>x</description>\n</ModMetaData>";
        let out = update_about(xml, &fields("costs $1 and $name", &[])).unwrap();
        assert!(out.contains("costs $1 and $name"));
    }

    #[test]
    fn test_stamp_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("About").join("About.xml");
        let versions = vec!["1.4".to_string()];
        let created = stamp_about(&path, &fields("desc", &versions)).unwrap();
        assert!(created);

        let xml = fs::read_to_string(&path).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<packageId>fluffy.colony</packageId>"));

        let created_again = stamp_about(&path, &fields("new desc", &versions)).unwrap();
        assert!(!created_again);
        assert!(fs::read_to_string(&path).unwrap().contains("<description>new desc</description>"));
    }

    #[test]
    fn test_dependency_package_ids_untouched() {
        let xml = "<ModMetaData>\n  <name>Colony</name>\n  <modDependencies>\n    <li>\n      <packageId>brrainz.harmony</packageId>\n      <displayName>Harmony</displayName>\n    </li>\n  </modDependencies>\n  <loadAfter>\n    <li>Ludeon.RimWorld</li>\n  </loadAfter>\n</ModMetaData>\n";
        let out = update_about(xml, &fields("desc", &[])).unwrap();

        assert!(out.contains("<li>\n      <packageId>brrainz.harmony</packageId>"));
        assert!(out.contains(
            "</loadAfter>\n  <packageId>fluffy.colony</packageId>\n  <description>desc</description>\n</ModMetaData>"
        ));
        assert_eq!(out.matches("<packageId>").count(), 2);

        // A second pass finds the top-level element it added
        let again = update_about(&out, &fields("desc", &[])).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn test_nested_target_version_kept() {
        let xml = "<ModMetaData>\n  <targetVersion>1.0</targetVersion>\n  <extra><targetVersion>keep</targetVersion></extra>\n</ModMetaData>";
        let out = update_about(xml, &fields("", &[])).unwrap();
        assert!(out.starts_with("<ModMetaData>\n  <extra><targetVersion>keep</targetVersion></extra>\n"));
    }

    #[test]
    fn test_comments_and_self_closing_children() {
        let xml = "<?xml version=\"1.0\"?>\n<!-- <name>commented</name> -->\n<ModMetaData>\n  <url/>\n  <description />\n</ModMetaData>";
        let out = update_about(xml, &fields("new", &[])).unwrap();
        assert!(out.contains("<!-- <name>commented</name> -->"));
        assert!(out.contains("<url/>"));
        assert!(out.contains("  <description>new</description>\n"));
    }

    #[test]
    fn test_unreadable_about_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("About.xml");
        let mut bytes = b"<ModMetaData>\n  <url>https://keep.me</url>\n  <name>Caf".to_vec();
        bytes.push(0xFF);
        bytes.extend_from_slice(b"</name>\n</ModMetaData>\n");
        fs::write(&path, &bytes).unwrap();

        let err = stamp_about(&path, &fields("desc", &[])).unwrap_err();
        assert!(matches!(err, ReleaseError::Io(_)));
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_directory_in_place_of_about_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("About.xml");
        fs::create_dir(&path).unwrap();
        assert!(stamp_about(&path, &fields("desc", &[])).is_err());
        assert!(path.is_dir());
    }

    fn manifest_fields() -> ManifestFields<'static> {
        ManifestFields {
            version: "1.3.31",
            manifest_uri: "https://raw.githubusercontent.com/fluffy/Colony/1.4/About/Manifest.xml",
            download_uri: "https://github.com/fluffy/Colony/releases/v1.3.31",
        }
    }

    #[test]
    fn test_manifest_created_then_updated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("About").join("Manifest.xml");
        assert!(stamp_manifest(&path, &manifest_fields()).unwrap());

        let xml = fs::read_to_string(&path).unwrap();
        assert!(xml.contains("<Manifest>\n  <version>1.3.31</version>"));
        assert!(xml.contains(
            "<manifestUri>https://raw.githubusercontent.com/fluffy/Colony/1.4/About/Manifest.xml</manifestUri>"
        ));

        let next = ManifestFields {
            version: "1.4.32",
            ..manifest_fields()
        };
        assert!(!stamp_manifest(&path, &next).unwrap());
        let xml = fs::read_to_string(&path).unwrap();
        assert!(xml.contains("<version>1.4.32</version>"));
        assert_eq!(xml.matches("<version>").count(), 1);
    }

    #[test]
    fn test_manifest_keeps_dependencies() {
        let xml = "<Manifest>\n  <identifier>Colony</identifier>\n  <version>1.0.0</version>\n  <dependencies>\n    <li>Harmony</li>\n  </dependencies>\n</Manifest>";
        let out = update_manifest(xml, &manifest_fields()).unwrap();
        assert!(out.contains("<identifier>Colony</identifier>\n  <version>1.3.31</version>"));
        assert!(out.contains("<li>Harmony</li>"));
        assert!(out.contains("  <downloadUri>https://github.com/fluffy/Colony/releases/v1.3.31</downloadUri>\n</Manifest>"));
        assert!(update_manifest("<ModMetaData></ModMetaData>", &manifest_fields()).is_err());
    }

    #[test]
    fn test_assembly_versions() {
        let source = "[assembly: AssemblyVersion(\"1.0.0.0\")]\r\n[assembly: AssemblyFileVersion(\"1.0.12\")]\r\n";
        let out = stamp_assembly_versions(source, &Version::new(2, 3, 45)).unwrap();
        assert_eq!(
            out,
            "[assembly: AssemblyVersion(\"2.0.0\")]\r\n[assembly: AssemblyFileVersion(\"2.3.45\")]\r\n"
        );
    }
}
