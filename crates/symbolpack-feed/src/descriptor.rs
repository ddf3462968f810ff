use anyhow::{anyhow, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use symbolpack_core::{merge_requirements, Requirement, Version};

/// Whether the descriptor's root element declares an XML namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorSchema {
    Namespaced(String),
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEntry {
    pub id: String,
    pub version_range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGroup {
    pub target_framework: Option<String>,
    pub dependencies: Vec<DependencyEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyLayout {
    None,
    Flat(Vec<DependencyEntry>),
    Grouped(Vec<DependencyGroup>),
}

/// A package's `.nuspec` descriptor, reduced to what resolution needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NuspecDocument {
    pub schema: DescriptorSchema,
    pub package_id: Option<String>,
    pub version: Option<String>,
    pub layout: DependencyLayout,
}

impl NuspecDocument {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));
        reader.config_mut().trim_text(true);

        let mut builder = DescriptorBuilder::default();
        loop {
            let event = reader.read_event().with_context(|| {
                format!(
                    "malformed descriptor near byte {}",
                    reader.buffer_position()
                )
            })?;
            match event {
                Event::Start(element) => builder.open(&element)?,
                Event::Empty(element) => {
                    builder.open(&element)?;
                    builder.close();
                }
                Event::End(_) => builder.close(),
                Event::Text(text) => {
                    let text = text.unescape().context("malformed descriptor text")?;
                    builder.text(&text);
                }
                Event::Eof => break,
                _ => {}
            }
        }
        builder.finish()
    }

    /// Every declared dependency with its lower bound as minimum, one entry
    /// per package id. Groups are flattened; the highest minimum wins.
    pub fn requirements(&self) -> Vec<Requirement> {
        let entries: Vec<&DependencyEntry> = match &self.layout {
            DependencyLayout::None => Vec::new(),
            DependencyLayout::Flat(entries) => entries.iter().collect(),
            DependencyLayout::Grouped(groups) => groups
                .iter()
                .flat_map(|group| group.dependencies.iter())
                .collect(),
        };

        merge_requirements(
            entries
                .into_iter()
                .map(|entry| {
                    Requirement::new(
                        entry.id.clone(),
                        entry.version_range.as_deref().and_then(range_lower_bound),
                    )
                })
                .collect(),
        )
    }
}

/// Lower bound of a NuGet version range. Bracketed ranges take the part
/// before the first comma; a bare version is its own minimum.
pub fn range_lower_bound(range: &str) -> Option<Version> {
    let trimmed = range.trim();
    let lower = if trimmed.starts_with('[') || trimmed.starts_with('(') {
        let inner = &trimmed[1..];
        match inner.split_once(',') {
            Some((left, _)) => left,
            None => inner.trim_end_matches(|ch| ch == ']' || ch == ')'),
        }
    } else {
        trimmed
    };

    let lower = lower.trim();
    (!lower.is_empty()).then(|| Version::parse(lower))
}

#[derive(Default)]
struct DescriptorBuilder {
    stack: Vec<String>,
    schema: Option<DescriptorSchema>,
    package_id: Option<String>,
    version: Option<String>,
    saw_dependencies: bool,
    flat: Vec<DependencyEntry>,
    groups: Vec<DependencyGroup>,
    open_group: Option<DependencyGroup>,
}

impl DescriptorBuilder {
    fn parent_is(&self, name: &str) -> bool {
        self.stack.last().map(String::as_str) == Some(name)
    }

    fn open(&mut self, element: &BytesStart<'_>) -> Result<()> {
        let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();

        if self.stack.is_empty() {
            if name != "package" {
                return Err(anyhow!(
                    "descriptor root element is '{name}', expected 'package'"
                ));
            }
            self.schema = Some(schema_of(element)?);
        }

        match name.as_str() {
            "dependencies" if self.parent_is("metadata") => self.saw_dependencies = true,
            "group" if self.parent_is("dependencies") => {
                self.open_group = Some(DependencyGroup {
                    target_framework: attribute(element, "targetFramework")?,
                    dependencies: Vec::new(),
                });
            }
            "dependency" if self.parent_is("group") => {
                if let (Some(entry), Some(group)) =
                    (dependency_entry(element)?, self.open_group.as_mut())
                {
                    group.dependencies.push(entry);
                }
            }
            "dependency" if self.parent_is("dependencies") => {
                if let Some(entry) = dependency_entry(element)? {
                    self.flat.push(entry);
                }
            }
            _ => {}
        }

        self.stack.push(name);
        Ok(())
    }

    fn close(&mut self) {
        let Some(name) = self.stack.pop() else {
            return;
        };
        if name == "group" && self.parent_is("dependencies") {
            if let Some(group) = self.open_group.take() {
                self.groups.push(group);
            }
        }
    }

    fn text(&mut self, text: &str) {
        let depth = self.stack.len();
        if depth < 2 || self.stack[depth - 2] != "metadata" {
            return;
        }
        match self.stack[depth - 1].as_str() {
            "id" => self.package_id = Some(text.trim().to_string()),
            "version" => self.version = Some(text.trim().to_string()),
            _ => {}
        }
    }

    fn finish(mut self) -> Result<NuspecDocument> {
        let schema = self
            .schema
            .take()
            .ok_or_else(|| anyhow!("descriptor has no root element"))?;

        let layout = if !self.groups.is_empty() {
            let mut groups = self.groups;
            if !self.flat.is_empty() {
                groups.insert(
                    0,
                    DependencyGroup {
                        target_framework: None,
                        dependencies: self.flat,
                    },
                );
            }
            DependencyLayout::Grouped(groups)
        } else if self.saw_dependencies || !self.flat.is_empty() {
            DependencyLayout::Flat(self.flat)
        } else {
            DependencyLayout::None
        };

        Ok(NuspecDocument {
            schema,
            package_id: self.package_id,
            version: self.version,
            layout,
        })
    }
}

fn schema_of(element: &BytesStart<'_>) -> Result<DescriptorSchema> {
    for attr in element.attributes() {
        let attr = attr.context("malformed descriptor attribute")?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            let uri = attr
                .unescape_value()
                .context("malformed descriptor namespace")?;
            return Ok(DescriptorSchema::Namespaced(uri.into_owned()));
        }
    }
    Ok(DescriptorSchema::Plain)
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.context("malformed descriptor attribute")?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .with_context(|| format!("malformed descriptor attribute '{name}'"))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn dependency_entry(element: &BytesStart<'_>) -> Result<Option<DependencyEntry>> {
    let Some(id) = attribute(element, "id")? else {
        return Ok(None);
    };
    let id = id.trim().to_string();
    if id.is_empty() {
        return Ok(None);
    }
    let version_range = attribute(element, "version")?.filter(|range| !range.trim().is_empty());
    Ok(Some(DependencyEntry { id, version_range }))
}
