use derive_more::{Constructor, Display, From};
use quick_xml::name::QName;

use super::event_summary::EventSummary;

/// Failure while parsing a rectilinear or image grid file, tagged with the section
/// of the file that was being read
#[derive(Debug, thiserror::Error, From)]
pub enum ParseError {
    #[error("Error parsing the VTKFile header: {0}")]
    Header(Header),
    #[error("Error parsing the RectilinearGrid or ImageData header: {0}")]
    GridHeader(GridHeader),
    #[error("Error parsing the Piece element: {0}")]
    Piece(Piece),
    #[error("Error parsing the Coordinates section: {0}")]
    Mesh(Mesh),
    #[error("Error parsing the PointData section: {0}")]
    PointData(PointData),
    #[error("Error closing the grid element: {0}")]
    CloseElements(CloseElements),
    #[error("Error parsing the AppendedData section: {0}")]
    AppendedData(AppendedData),
    #[error("{0}")]
    ArrayLength(ArrayLength),
}

#[derive(From, Display, Debug)]
#[display(fmt = "failed to parse an xml element: {xml_err}")]
pub struct MalformedXml {
    xml_err: quick_xml::Error,
}

#[derive(From, Display, Debug)]
#[display(fmt = "failed to parse an xml attribute: {att_err}")]
pub struct MalformedAttribute {
    att_err: quick_xml::events::attributes::AttrError,
}

#[derive(Display, Debug)]
#[display(fmt = "unexpected element. Expected `{expected_name}`, got {actual_element}")]
pub struct UnexpectedElement {
    expected_name: String,
    actual_element: EventSummary,
}

impl UnexpectedElement {
    pub(crate) fn new<T: Into<String>>(expected_name: T, actual_element: EventSummary) -> Self {
        Self {
            expected_name: expected_name.into(),
            actual_element,
        }
    }
}

#[derive(Display, Debug, Constructor)]
#[display(
    fmt = "unexpected attribute value for {attribute_name} in {element_name} element: expected {expected_value}, got {actual_value}"
)]
pub struct UnexpectedAttributeValue {
    pub(crate) element_name: String,
    pub(crate) attribute_name: String,
    pub(crate) expected_value: String,
    pub(crate) actual_value: ParsedNameOrBytes,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "missing attribute `{attribute_name}` in {element_name} element")]
pub struct MissingAttribute {
    element_name: String,
    attribute_name: String,
}

/// an attribute that is present but whose value cannot be used
#[derive(Display, Debug, Constructor)]
#[display(fmt = "attribute `{attribute_name}` of {element_name} has an unusable value {value}")]
pub struct InvalidAttribute {
    element_name: String,
    attribute_name: String,
    value: ParsedNameOrBytes,
}

#[derive(Display, Debug)]
pub enum ParsedNameOrBytes {
    #[display(fmt = "{_0}")]
    Utf8(String),
    #[display(fmt = "{_0:?} (cannot convert to UTF8 string)")]
    Bytes(Vec<u8>),
}

impl ParsedNameOrBytes {
    pub(crate) fn new(bytes: &[u8]) -> Self {
        match String::from_utf8(bytes.to_vec()) {
            Ok(string) => Self::Utf8(string),
            Err(e) => Self::Bytes(e.into_bytes()),
        }
    }
}

impl<'a> From<QName<'a>> for ParsedNameOrBytes {
    fn from(x: QName) -> Self {
        Self::new(x.as_ref())
    }
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "Failed to decode the inline {format} data of array `{array_name}`")]
pub struct InlineArray {
    array_name: String,
    format: &'static str,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "array `{array_name}` holds {found} values, the grid needs {expected}")]
pub struct ArrayLength {
    array_name: String,
    expected: usize,
    found: usize,
}

#[derive(Debug, thiserror::Error, From)]
pub enum Header {
    #[error("{0}")]
    MalformedXml(MalformedXml),
    #[error("{0}")]
    MalformedAttribute(MalformedAttribute),
    #[error("{0}")]
    UnexpectedElement(UnexpectedElement),
    #[error("{0}")]
    UnexpectedAttributeValue(UnexpectedAttributeValue),
    #[error("{0}")]
    InvalidAttribute(InvalidAttribute),
}

#[derive(Debug, thiserror::Error, From)]
pub enum GridHeader {
    #[error("{0}")]
    MalformedXml(MalformedXml),
    #[error("{0}")]
    MalformedAttribute(MalformedAttribute),
    #[error("{0}")]
    MissingAttribute(MissingAttribute),
    #[error("{0}")]
    UnexpectedElement(UnexpectedElement),
    #[error("{0}")]
    InvalidAttribute(InvalidAttribute),
}

#[derive(Debug, thiserror::Error, From)]
pub enum Piece {
    #[error("{0}")]
    MalformedXml(MalformedXml),
    #[error("{0}")]
    MalformedAttribute(MalformedAttribute),
    #[error("{0}")]
    MissingAttribute(MissingAttribute),
    #[error("{0}")]
    UnexpectedElement(UnexpectedElement),
    #[error("{0}")]
    InvalidAttribute(InvalidAttribute),
}

#[derive(Debug, thiserror::Error, From)]
pub enum Mesh {
    #[error("{0}")]
    MalformedXml(MalformedXml),
    #[error("{0}")]
    MalformedAttribute(MalformedAttribute),
    #[error("{0}")]
    MissingAttribute(MissingAttribute),
    #[error("{0}")]
    UnexpectedElement(UnexpectedElement),
    #[error("{0}")]
    InvalidAttribute(InvalidAttribute),
    #[error("{0}")]
    InlineArray(InlineArray),
    #[error("the Coordinates element holds {0} arrays instead of 3")]
    CoordinateCount(usize),
}

#[derive(Debug, thiserror::Error, From)]
pub enum PointData {
    #[error("{0}")]
    MalformedXml(MalformedXml),
    #[error("{0}")]
    MalformedAttribute(MalformedAttribute),
    #[error("{0}")]
    MissingAttribute(MissingAttribute),
    #[error("{0}")]
    UnexpectedElement(UnexpectedElement),
    #[error("{0}")]
    InvalidAttribute(InvalidAttribute),
    #[error("{0}")]
    InlineArray(InlineArray),
}

#[derive(Debug, thiserror::Error, From)]
pub enum CloseElements {
    #[error("{0}")]
    MalformedXml(MalformedXml),
    #[error("{0}")]
    UnexpectedElement(UnexpectedElement),
    #[error("the Piece element has no Coordinates section")]
    MissingCoordinates,
}

#[derive(Debug, thiserror::Error, From)]
pub enum AppendedData {
    #[error("{0}")]
    MalformedXml(MalformedXml),
    #[error("{0}")]
    MalformedAttribute(MalformedAttribute),
    #[error("{0}")]
    MissingAttribute(MissingAttribute),
    #[error("{0}")]
    UnexpectedElement(UnexpectedElement),
    #[error("{0}")]
    UnexpectedAttributeValue(UnexpectedAttributeValue),
    #[error("An io error occured while reading the appended section: `{0}`")]
    Io(std::io::Error),
    #[error("{0}")]
    ParsingBinary(ParsingBinary),
}

#[derive(Debug, thiserror::Error)]
pub enum ParsingBinary {
    #[error("the raw appended section does not start with `_`")]
    LeadingMarker,
    #[error("array `{name}` at offset {offset} runs past the end of the appended section")]
    Truncated { name: String, offset: u64 },
    #[error("array `{name}` holds {bytes} bytes which is not a multiple of its {size} byte values")]
    PartialValue { name: String, bytes: usize, size: usize },
}
