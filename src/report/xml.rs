use std::fmt;
use std::io::Write;

use crate::errors::Result;
use crate::report::dump::FeatureRecord;
use crate::report::metadata::LayerMetadata;
use crate::report::ReportWriter;
use crate::utils::format_f;

/// An element of an XML tree: attributes, optional text and child elements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: &str) -> XmlNode {
        XmlNode {
            name: name.to_string(),
            ..XmlNode::default()
        }
    }

    /// Element holding only `text`.
    pub fn with_text(name: &str, text: &str) -> XmlNode {
        XmlNode {
            text: Some(text.to_string()),
            ..XmlNode::new(name)
        }
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) -> &mut XmlNode {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = Some(text.to_string());
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn add_child(&mut self, child: XmlNode) -> &mut XmlNode {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// First child element called `name`.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Serializes the tree, two spaces of indentation per level and one
    /// element per line. Empty elements are written `<Name />`, elements
    /// with text and no children on a single line.
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    fn serialize_into(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        write!(f, "{indent}<{}", self.name)?;
        for (name, value) in &self.attributes {
            write!(f, " {name}=\"{}\"", escape(value))?;
        }
        match (&self.text, self.children.is_empty()) {
            (None, true) => f.write_str(" />\n"),
            (Some(text), true) => writeln!(f, ">{}</{}>", escape(text), self.name),
            (text, false) => {
                f.write_str(">\n")?;
                if let Some(text) = text {
                    writeln!(f, "{indent}  {}", escape(text))?;
                }
                for child in &self.children {
                    child.serialize_into(f, depth + 1)?;
                }
                writeln!(f, "{indent}</{}>", self.name)
            }
        }
    }
}

impl fmt::Display for XmlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.serialize_into(f, 0)
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn meta_node(metadata: &LayerMetadata) -> XmlNode {
    let mut meta = XmlNode::new("Meta");
    meta.add_child(XmlNode::with_text("Name", &metadata.name));
    let Some(details) = &metadata.details else {
        return meta;
    };

    if let Some(count) = details.feature_count {
        meta.add_child(XmlNode::with_text("FeatureCount", &count.to_string()));
    }
    for field in &metadata.geometry_fields {
        let mut node = XmlNode::new("GeometryField");
        node.set_attribute("name", &field.name)
            .set_attribute("type", field.geometry_type.name());
        if let Some(extent) = field.extent.or(details.extent) {
            let mut extent_node = XmlNode::new("Extent");
            extent_node
                .set_attribute("minx", &format_f(extent.min_x))
                .set_attribute("miny", &format_f(extent.min_y))
                .set_attribute("maxx", &format_f(extent.max_x))
                .set_attribute("maxy", &format_f(extent.max_y));
            node.add_child(extent_node);
        }
        node.add_child(XmlNode::with_text("SRS", &field.spatial_ref));
        meta.add_child(node);
    }
    for field in &metadata.fields {
        let mut node = XmlNode::new("Field");
        node.set_attribute("name", field.name())
            .set_attribute("type", field.field_type().name())
            .set_attribute("width", &field.width().to_string())
            .set_attribute("precision", &field.precision().to_string());
        meta.add_child(node);
    }
    meta
}

/// Builds the `Feature` element of a record.
pub fn feature_node(record: &FeatureRecord) -> XmlNode {
    let mut feature = XmlNode::new("Feature");
    feature.set_attribute("id", &record.display_fid().to_string());
    for attribute in &record.attributes {
        let mut node = XmlNode::new("Attr");
        node.set_attribute("name", &attribute.name);
        if attribute.content.is_set() {
            node.set_text(attribute.display().unwrap_or_default());
        }
        feature.add_child(node);
    }
    if let Some(style) = &record.style {
        feature.add_child(XmlNode::with_text("Style", style));
    }
    for value in &record.geometries {
        let mut node = XmlNode::new("Geometry");
        node.set_attribute("name", &value.name);
        if let Some(geometry) = &value.geometry {
            node.set_text(&geometry.wkt);
        }
        feature.add_child(node);
    }
    feature
}

/// One `Layer` document per layer, written once the layer is complete.
#[derive(Debug, Default)]
pub struct XmlTreeWriter {
    layer: Option<XmlNode>,
    features: Vec<XmlNode>,
}

impl XmlTreeWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportWriter for XmlTreeWriter {
    fn begin_layer(&mut self, _out: &mut dyn Write, metadata: &LayerMetadata) -> Result<()> {
        let mut layer = XmlNode::new("Layer");
        layer.add_child(meta_node(metadata));
        self.layer = Some(layer);
        self.features.clear();
        Ok(())
    }

    fn feature(
        &mut self,
        _out: &mut dyn Write,
        _metadata: &LayerMetadata,
        record: &FeatureRecord,
    ) -> Result<()> {
        self.features.push(feature_node(record));
        Ok(())
    }

    fn end_layer(&mut self, out: &mut dyn Write, metadata: &LayerMetadata) -> Result<()> {
        let mut layer = self.layer.take().unwrap_or_else(|| {
            let mut layer = XmlNode::new("Layer");
            layer.add_child(meta_node(metadata));
            layer
        });
        let mut features = XmlNode::new("Features");
        for feature in self.features.drain(..) {
            features.add_child(feature);
        }
        layer.add_child(features);
        writeln!(out, "{layer}")?;
        Ok(())
    }

    fn reports_missing_features(&self) -> bool {
        false
    }
}
