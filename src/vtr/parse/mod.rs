//! reading and parsing xml rectilinear grid (`.vtr`) and image data (`.vti`) files
//!
//! The parser walks the document with `quick_xml` events one section at a
//! time. Every section has its own error type so that a failure names the part
//! of the file it happened in. Inline arrays are decoded as they are read,
//! arrays stored in the `AppendedData` section are resolved once the raw bytes
//! at the end of the file are available.

pub mod error;
mod event_summary;

pub use error::ParseError;
use event_summary::EventSummary;

use error::{InlineArray, InvalidAttribute, MalformedAttribute, MalformedXml, MissingAttribute, UnexpectedElement};

use std::io::{BufRead, Read};

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;

use super::array::{DataArray, Precision};
use super::mesh::{Mesh3D, Spans3D};
use super::VtrFile;

/// read in and parse an entire grid file for a given path
pub fn read_and_parse(path: &std::path::Path) -> Result<VtrFile, crate::Error> {
    let file = std::fs::File::open(path)?;
    let buf_reader = std::io::BufReader::new(file);
    let reader = Reader::from_reader(buf_reader);

    Ok(parse_xml_document(reader)?)
}

/// width of the byte count in front of every binary block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderType {
    UInt32,
    UInt64,
}

impl HeaderType {
    fn size(&self) -> usize {
        match self {
            Self::UInt32 => 4,
            Self::UInt64 => 8,
        }
    }

    fn read(&self, bytes: &[u8]) -> Option<u64> {
        match self {
            Self::UInt32 => {
                let b = bytes.get(..4)?;
                Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as u64)
            }
            Self::UInt64 => {
                let mut raw = [0; 8];
                raw.copy_from_slice(bytes.get(..8)?);
                Some(u64::from_le_bytes(raw))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// Describes where the values of a `DataArray` are stored
enum ArrayFormat {
    /// whitespace separated numbers inside the element
    InlineAscii,
    /// base64 encoded block inside the element
    InlineBase64,
    /// raw block at `offset` in the `AppendedData` section
    AppendedBinary { offset: u64 },
}

#[derive(Debug, Clone, PartialEq)]
struct DataArrayHeader {
    name: String,
    precision: Precision,
    components: usize,
    format: ArrayFormat,
}

/// dataset named by the `type` attribute of `VTKFile`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GridKind {
    /// explicit point coordinates in a `Coordinates` section
    Rectilinear,
    /// points at `Origin + index * Spacing`
    Image,
}

impl GridKind {
    fn element_name(&self) -> &'static str {
        match self {
            Self::Rectilinear => "RectilinearGrid",
            Self::Image => "ImageData",
        }
    }
}

/// placement of the points of an `ImageData` grid
#[derive(Debug, Clone, Copy, PartialEq)]
struct ImageGeometry {
    origin: [f64; 3],
    spacing: [f64; 3],
}

impl Default for ImageGeometry {
    fn default() -> Self {
        Self {
            origin: [0.; 3],
            spacing: [1.; 3],
        }
    }
}

impl ImageGeometry {
    /// point locations along each axis for the indices covered by `extent`
    fn mesh(&self, extent: &Spans3D) -> Mesh3D {
        let axis = |a: usize, start: usize, end: usize| -> Vec<f64> {
            (start..=end)
                .map(|index| self.origin[a] + index as f64 * self.spacing[a])
                .collect()
        };

        Mesh3D::new(
            axis(0, extent.x_start, extent.x_end),
            axis(1, extent.y_start, extent.y_end),
            axis(2, extent.z_start, extent.z_end),
        )
    }
}

/// an array whose values are `None` until the appended section is read
#[derive(Debug)]
struct PartialDataArray {
    header: DataArrayHeader,
    values: Option<Vec<f64>>,
}

impl PartialDataArray {
    fn is_appended(&self) -> bool {
        self.values.is_none()
    }

    fn finish(self, appended: &[u8], header_type: HeaderType) -> Result<DataArray, error::AppendedData> {
        let DataArrayHeader {
            name,
            precision,
            components,
            format,
        } = self.header;

        let values = match (self.values, format) {
            (Some(values), _) => values,
            (None, ArrayFormat::AppendedBinary { offset }) => {
                let bytes = appended_block(appended, offset, header_type)
                    .ok_or_else(|| error::ParsingBinary::Truncated {
                        name: name.clone(),
                        offset,
                    })?;

                if bytes.len() % precision.size() != 0 {
                    return Err(error::ParsingBinary::PartialValue {
                        name,
                        bytes: bytes.len(),
                        size: precision.size(),
                    }
                    .into());
                }

                precision.decode(bytes)
            }
            (None, _) => Vec::new(),
        };

        Ok(DataArray {
            name,
            components,
            precision,
            values,
        })
    }
}

/// the data of the block starting at `offset`, without its byte count header
fn appended_block(appended: &[u8], offset: u64, header_type: HeaderType) -> Option<&[u8]> {
    let start = usize::try_from(offset).ok()?;
    let len = header_type.read(appended.get(start..)?)?;
    let data_start = start + header_type.size();
    let data_end = data_start.checked_add(usize::try_from(len).ok()?)?;
    appended.get(data_start..data_end)
}

/// error types of the sections that hold `DataArray` elements
trait ArrayError:
    From<MalformedXml>
    + From<MalformedAttribute>
    + From<MissingAttribute>
    + From<UnexpectedElement>
    + From<InvalidAttribute>
    + From<InlineArray>
{
}

impl<T> ArrayError for T where
    T: From<MalformedXml>
        + From<MalformedAttribute>
        + From<MissingAttribute>
        + From<UnexpectedElement>
        + From<InvalidAttribute>
        + From<InlineArray>
{
}

#[doc(hidden)]
pub fn parse_xml_document<R: BufRead>(mut reader: Reader<R>) -> Result<VtrFile, ParseError> {
    let mut buffer = Vec::new();

    // ignore whitespace in the reader
    reader.trim_text(true);

    let (header_type, kind) = read_to_grid_header(&mut reader, &mut buffer)?;

    let (whole_extent, geometry) = read_grid_header(&mut reader, &mut buffer, kind)?;
    let extent = read_piece_header(&mut reader, &mut buffer)?;

    if extent != whole_extent {
        log::debug!(
            "piece extent `{}` differs from the whole extent `{}`",
            extent,
            whole_extent
        );
    }

    let (coordinates, point_arrays) = read_piece_sections(&mut reader, &mut buffer, header_type)?;

    let _ = read_ending_element::<error::CloseElements, _>(&mut reader, &mut buffer, kind.element_name())?;

    let coordinates = match geometry {
        None => Some(coordinates.ok_or(error::CloseElements::MissingCoordinates)?),
        Some(_) => {
            if coordinates.is_some() {
                log::debug!("ignoring the Coordinates section of an ImageData piece");
            }
            None
        }
    };

    let needs_appended = coordinates
        .iter()
        .flatten()
        .chain(point_arrays.iter())
        .any(PartialDataArray::is_appended);

    let appended = if needs_appended {
        read_appended_data(&mut reader, &mut buffer)?
    } else {
        Vec::new()
    };

    let mesh = match (coordinates, geometry) {
        (Some([x, y, z]), _) => {
            let x = x.finish(&appended, header_type)?;
            let y = y.finish(&appended, header_type)?;
            let z = z.finish(&appended, header_type)?;

            for (array, expected) in [(&x, extent.x_len()), (&y, extent.y_len()), (&z, extent.z_len())] {
                check_length(array, expected)?;
            }

            Mesh3D::new(x.values, y.values, z.values)
        }
        (None, Some(image)) => image.mesh(&extent),
        (None, None) => return Err(error::CloseElements::MissingCoordinates.into()),
    };

    let mut point_data = Vec::with_capacity(point_arrays.len());
    for partial in point_arrays {
        let array = partial.finish(&appended, header_type)?;
        check_length(&array, extent.num_points() * array.components)?;
        point_data.push(array);
    }

    Ok(VtrFile {
        extent,
        mesh,
        point_data,
    })
}

fn check_length(array: &DataArray, expected: usize) -> Result<(), error::ArrayLength> {
    if array.values.len() == expected {
        Ok(())
    } else {
        Err(error::ArrayLength::new(
            array.name.clone(),
            expected,
            array.values.len(),
        ))
    }
}

/// read the next event, reusing `buffer`
fn next_event<'a, E, R: BufRead>(reader: &mut Reader<R>, buffer: &'a mut Vec<u8>) -> Result<Event<'a>, E>
where
    E: From<MalformedXml>,
{
    buffer.clear();
    let event = reader
        .read_event_into(buffer)
        .map_err(MalformedXml::from)?;

    Ok(event)
}

/// find the `VTKFile` element, check it holds a little endian rectilinear or
/// image grid and return the width of the binary block headers with the grid kind
fn read_to_grid_header<R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &mut Vec<u8>,
) -> Result<(HeaderType, GridKind), error::Header> {
    loop {
        let event = next_event::<error::Header, _>(reader, buffer)?;

        let start = match &event {
            // declarations and comments may come before the root element
            Event::Decl(_) | Event::Comment(_) | Event::DocType(_) | Event::PI(_) => continue,
            Event::Start(start) if start.name().as_ref() == b"VTKFile" => start,
            _ => {
                let actual_event = EventSummary::new(&event);
                return Err(UnexpectedElement::new("VTKFile", actual_event).into());
            }
        };

        let mut header_type = HeaderType::UInt32;
        let mut kind = GridKind::Rectilinear;

        for attribute in start.attributes() {
            let attribute = attribute.map_err(MalformedAttribute::from)?;

            match attribute.key.as_ref() {
                b"type" => {
                    kind = match attribute.value.as_ref() {
                        b"RectilinearGrid" => GridKind::Rectilinear,
                        b"ImageData" => GridKind::Image,
                        other => {
                            let unexpected = error::UnexpectedAttributeValue::new(
                                "VTKFile".into(),
                                "type".into(),
                                "RectilinearGrid or ImageData".into(),
                                error::ParsedNameOrBytes::new(other),
                            );
                            return Err(unexpected.into());
                        }
                    }
                }
                b"byte_order" => {
                    check_attribute_value(&attribute, "VTKFile", "byte_order", "LittleEndian")?
                }
                b"header_type" => {
                    header_type = match attribute.value.as_ref() {
                        b"UInt32" => HeaderType::UInt32,
                        b"UInt64" => HeaderType::UInt64,
                        _ => return Err(invalid_attribute(&attribute, "VTKFile", "header_type").into()),
                    }
                }
                // compressed blocks are not supported
                b"compressor" => {
                    return Err(invalid_attribute(&attribute, "VTKFile", "compressor").into())
                }
                _ => (),
            }
        }

        return Ok((header_type, kind));
    }
}

/// Parse the `RectilinearGrid` or `ImageData` element header and return the
/// contents of its `WholeExtent` attribute. Image grids also give the placement
/// of their points, `Origin` defaults to zero and `Spacing` to one.
fn read_grid_header<R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &mut Vec<u8>,
    kind: GridKind,
) -> Result<(Spans3D, Option<ImageGeometry>), error::GridHeader> {
    let name = kind.element_name();
    let event = read_starting_element_with_name::<error::GridHeader, _>(reader, buffer, name)?;

    let extent = get_attribute_value::<error::GridHeader>(&event, "WholeExtent", name)?;
    let extent = parse_spans(&extent, name, "WholeExtent")?;

    if kind == GridKind::Rectilinear {
        return Ok((extent, None));
    }

    let mut geometry = ImageGeometry::default();

    if let Some(origin) = find_attribute::<error::GridHeader>(&event, "Origin")? {
        geometry.origin = parse_triple(&origin).ok_or_else(|| invalid_attribute(&origin, name, "Origin"))?;
    }

    if let Some(spacing) = find_attribute::<error::GridHeader>(&event, "Spacing")? {
        geometry.spacing = parse_triple(&spacing)
            .filter(|steps| steps.iter().all(|h| h.is_finite()))
            .ok_or_else(|| invalid_attribute(&spacing, name, "Spacing"))?;
    }

    // rotated images do not map onto axis aligned coordinates
    if let Some(direction) = find_attribute::<error::GridHeader>(&event, "Direction")? {
        let identity = [1., 0., 0., 0., 1., 0., 0., 0., 1.];
        let values: Option<Vec<f64>> = std::str::from_utf8(&direction.value)
            .ok()
            .and_then(|text| text.split_ascii_whitespace().map(str::parse).collect::<Result<_, _>>().ok());

        if values.as_deref() != Some(&identity[..]) {
            return Err(invalid_attribute(&direction, name, "Direction").into());
        }
    }

    Ok((extent, Some(geometry)))
}

/// three whitespace separated numbers
fn parse_triple(attribute: &Attribute) -> Option<[f64; 3]> {
    let text = std::str::from_utf8(&attribute.value).ok()?;
    let values: Vec<f64> = text
        .split_ascii_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;

    <[f64; 3]>::try_from(values).ok()
}

/// open the `Piece` element and return its `Extent`
fn read_piece_header<R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &mut Vec<u8>,
) -> Result<Spans3D, error::Piece> {
    let piece = read_starting_element_with_name::<error::Piece, _>(reader, buffer, "Piece")?;

    let extent = get_attribute_value::<error::Piece>(&piece, "Extent", "Piece")?;
    parse_spans(&extent, "Piece", "Extent").map_err(Into::into)
}

fn parse_spans(attribute: &Attribute, element_name: &str, attribute_name: &str) -> Result<Spans3D, InvalidAttribute> {
    std::str::from_utf8(&attribute.value)
        .ok()
        .and_then(Spans3D::from_span_string)
        .ok_or_else(|| invalid_attribute(attribute, element_name, attribute_name))
}

enum Section {
    Coordinates,
    PointData,
    CellData,
}

/// read the `Coordinates`, `PointData` and `CellData` children of `Piece` (in any order)
/// up to and including `</Piece>`
fn read_piece_sections<R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &mut Vec<u8>,
    header_type: HeaderType,
) -> Result<(Option<[PartialDataArray; 3]>, Vec<PartialDataArray>), ParseError> {
    let mut coordinates = None;
    let mut point_data = Vec::new();

    loop {
        let event = next_event::<error::Piece, _>(reader, buffer)?;

        let section = match &event {
            Event::Start(start) => match start.name().as_ref() {
                b"Coordinates" => Section::Coordinates,
                b"PointData" => Section::PointData,
                b"CellData" => Section::CellData,
                _ => return Err(unexpected_in_piece(&event).into()),
            },
            Event::Empty(empty) if matches!(empty.name().as_ref(), b"PointData" | b"CellData") => continue,
            Event::End(end) if end.name().as_ref() == b"Piece" => break,
            _ => return Err(unexpected_in_piece(&event).into()),
        };

        match section {
            Section::Coordinates => {
                let arrays = read_arrays::<error::Mesh, _>(reader, buffer, header_type, "Coordinates")?;
                let arrays = <[PartialDataArray; 3]>::try_from(arrays)
                    .map_err(|arrays| error::Mesh::CoordinateCount(arrays.len()))?;
                coordinates = Some(arrays);
            }
            Section::PointData => {
                let arrays = read_arrays::<error::PointData, _>(reader, buffer, header_type, "PointData")?;
                point_data.extend(arrays);
            }
            Section::CellData => {
                let arrays = read_arrays::<error::PointData, _>(reader, buffer, header_type, "CellData")?;
                if arrays.iter().any(PartialDataArray::is_appended) {
                    log::debug!("cell data arrays in the appended section are ignored");
                }
                log::debug!("skipping {} cell data arrays", arrays.len());
            }
        }
    }

    Ok((coordinates, point_data))
}

fn unexpected_in_piece(event: &Event) -> error::Piece {
    let actual_event = EventSummary::new(event);
    UnexpectedElement::new("Coordinates, PointData, CellData or /Piece", actual_event).into()
}

/// read `DataArray` elements until the closing element of `section`
fn read_arrays<E: ArrayError, R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &mut Vec<u8>,
    header_type: HeaderType,
    section: &str,
) -> Result<Vec<PartialDataArray>, E> {
    let mut arrays = Vec::new();

    loop {
        let event = next_event::<E, _>(reader, buffer)?;

        let (header, was_empty) = match &event {
            Event::Start(start) if start.name().as_ref() == b"DataArray" => {
                (read_dataarray_header::<E>(start)?, false)
            }
            Event::Empty(empty) if empty.name().as_ref() == b"DataArray" => {
                (read_dataarray_header::<E>(empty)?, true)
            }
            Event::End(end) if end.name().as_ref() == section.as_bytes() => break,
            _ => {
                let actual_event = EventSummary::new(&event);
                let expected = format!("DataArray or /{section}");
                return Err(UnexpectedElement::new(expected, actual_event).into());
            }
        };

        let array = parse_dataarray_or_lazy::<E, _>(reader, buffer, header, was_empty, header_type)?;
        arrays.push(array);
    }

    Ok(arrays)
}

/// Parse the header attributes of a `DataArray` element:
///
/// ```ignore
/// <DataArray type="Float64" Name="vel" NumberOfComponents="3" format="appended" offset="0">
/// ```
///
/// `NumberOfComponents` defaults to 1 when missing.
fn read_dataarray_header<E: ArrayError>(array_start: &BytesStart) -> Result<DataArrayHeader, E> {
    let name = get_attribute_value::<E>(array_start, "Name", "DataArray")?;
    let name = String::from_utf8_lossy(&name.value).into_owned();

    let precision = get_attribute_value::<E>(array_start, "type", "DataArray")?;
    let precision = Precision::from_name(&precision.value)
        .ok_or_else(|| invalid_attribute(&precision, "DataArray", "type"))?;

    let components = match find_attribute::<E>(array_start, "NumberOfComponents")? {
        Some(attribute) => parse_attribute::<usize>(&attribute)
            .filter(|components| *components > 0)
            .ok_or_else(|| invalid_attribute(&attribute, "DataArray", "NumberOfComponents"))?,
        None => 1,
    };

    let format = get_attribute_value::<E>(array_start, "format", "DataArray")?;
    let format = match format.value.as_ref() {
        b"ascii" => ArrayFormat::InlineAscii,
        b"binary" => ArrayFormat::InlineBase64,
        b"appended" => {
            let offset = get_attribute_value::<E>(array_start, "offset", "DataArray")?;
            let offset = parse_attribute::<u64>(&offset)
                .ok_or_else(|| invalid_attribute(&offset, "DataArray", "offset"))?;
            ArrayFormat::AppendedBinary { offset }
        }
        _ => return Err(invalid_attribute(&format, "DataArray", "format").into()),
    };

    Ok(DataArrayHeader {
        name,
        precision,
        components,
        format,
    })
}

/// Parse the body of a data array (if its inline) or leave its values for the
/// appended section. Consumes the closing `</DataArray>` when the element was not empty.
fn parse_dataarray_or_lazy<E: ArrayError, R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &mut Vec<u8>,
    header: DataArrayHeader,
    was_empty: bool,
    header_type: HeaderType,
) -> Result<PartialDataArray, E> {
    let empty_values = match header.format {
        ArrayFormat::AppendedBinary { .. } => None,
        _ => Some(Vec::new()),
    };

    if was_empty {
        return Ok(PartialDataArray {
            header,
            values: empty_values,
        });
    }

    let event = next_event::<E, _>(reader, buffer)?;

    let (values, closed) = match (event, header.format) {
        (Event::Text(text), ArrayFormat::InlineAscii) => {
            let bytes = text.into_inner();
            (Some(parse_ascii_inner_dataarray(&bytes, &header.name)?), false)
        }
        (Event::Text(text), ArrayFormat::InlineBase64) => {
            let bytes = text.into_inner();
            let values = parse_base64_inner_dataarray(&bytes, header.precision, header_type, &header.name)?;
            (Some(values), false)
        }
        (Event::End(end), _) if end.name().as_ref() == b"DataArray" => (empty_values, true),
        (other, _) => {
            let actual_event = EventSummary::new(&other);
            return Err(UnexpectedElement::new("/DataArray", actual_event).into());
        }
    };

    if !closed {
        let _ = read_ending_element::<E, _>(reader, buffer, "DataArray")?;
    }

    Ok(PartialDataArray { header, values })
}

/// parse the values for a single inline ascii encoded array
fn parse_ascii_inner_dataarray(xml_bytes: &[u8], array_name: &str) -> Result<Vec<f64>, InlineArray> {
    let error = || InlineArray::new(array_name.to_string(), "ascii");

    let text = std::str::from_utf8(xml_bytes).map_err(|_| error())?;

    text.split_ascii_whitespace()
        .map(|number| number.parse::<f64>().map_err(|_| error()))
        .collect()
}

/// parse the values for a single inline base64 encoded array: the decoded
/// bytes start with the byte count of the data that follows
fn parse_base64_inner_dataarray(
    base64_encoded_bytes: &[u8],
    precision: Precision,
    header_type: HeaderType,
    array_name: &str,
) -> Result<Vec<f64>, InlineArray> {
    let error = || InlineArray::new(array_name.to_string(), "base64");

    let cleaned: Vec<u8> = base64_encoded_bytes
        .iter()
        .copied()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();

    let numerical_bytes = base64::decode(&cleaned).map_err(|_| error())?;

    let len = header_type
        .read(&numerical_bytes)
        .and_then(|len| usize::try_from(len).ok())
        .ok_or_else(error)?;

    let data = numerical_bytes
        .get(header_type.size()..)
        .and_then(|rest| rest.get(..len))
        .filter(|data| data.len() % precision.size() == 0)
        .ok_or_else(error)?;

    Ok(precision.decode(data))
}

/// open the `AppendedData` element and return every raw byte after its `_` marker
fn read_appended_data<R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &mut Vec<u8>,
) -> Result<Vec<u8>, error::AppendedData> {
    let appended_data =
        read_starting_element_with_name::<error::AppendedData, _>(reader, buffer, "AppendedData")?;

    let encoding = get_attribute_value::<error::AppendedData>(&appended_data, "encoding", "AppendedData")?;
    check_attribute_value(&encoding, "AppendedData", "encoding", "raw")?;

    // the raw bytes are not xml, pull them from the underlying reader
    let mut raw = Vec::new();
    reader.get_mut().read_to_end(&mut raw)?;

    match raw.iter().position(|byte| !byte.is_ascii_whitespace()) {
        Some(marker) if raw[marker] == b'_' => Ok(raw.split_off(marker + 1)),
        _ => Err(error::ParsingBinary::LeadingMarker.into()),
    }
}

fn read_starting_element_with_name<'a, E, R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &'a mut Vec<u8>,
    expected_name: &str,
) -> Result<BytesStart<'a>, E>
where
    E: From<UnexpectedElement> + From<MalformedXml>,
{
    let element = next_event::<E, _>(reader, buffer)?;

    match element {
        Event::Start(event) if event.name().as_ref() == expected_name.as_bytes() => Ok(event),
        other => {
            let actual_event = EventSummary::new(&other);
            Err(E::from(UnexpectedElement::new(expected_name, actual_event)))
        }
    }
}

fn read_ending_element<'a, E, R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &'a mut Vec<u8>,
    expected_name: &str,
) -> Result<BytesEnd<'a>, E>
where
    E: From<UnexpectedElement> + From<MalformedXml>,
{
    let element = next_event::<E, _>(reader, buffer)?;

    match element {
        Event::End(event) if event.name().as_ref() == expected_name.as_bytes() => Ok(event),
        other => {
            let actual_event = EventSummary::new(&other);
            let unexpected = UnexpectedElement::new(format!("/{expected_name}"), actual_event);
            Err(E::from(unexpected))
        }
    }
}

/// the `attribute_key` attribute of an element, if present
fn find_attribute<'a, E>(bytes_start: &'a BytesStart<'_>, attribute_key: &str) -> Result<Option<Attribute<'a>>, E>
where
    E: From<MalformedAttribute>,
{
    for attribute in bytes_start.attributes() {
        let attribute = attribute.map_err(MalformedAttribute::from)?;
        if attribute.key.as_ref() == attribute_key.as_bytes() {
            return Ok(Some(attribute));
        }
    }

    Ok(None)
}

fn get_attribute_value<'a, E>(
    bytes_start: &'a BytesStart<'_>,
    attribute_key: &str,
    element_name: &str,
) -> Result<Attribute<'a>, E>
where
    E: From<MissingAttribute> + From<MalformedAttribute>,
{
    match find_attribute::<E>(bytes_start, attribute_key)? {
        Some(attribute) => Ok(attribute),
        None => {
            let err = MissingAttribute::new(element_name.into(), attribute_key.into());
            Err(E::from(err))
        }
    }
}

fn parse_attribute<T: std::str::FromStr>(attribute: &Attribute) -> Option<T> {
    std::str::from_utf8(&attribute.value).ok()?.trim().parse().ok()
}

fn invalid_attribute(attribute: &Attribute, element_name: &str, attribute_name: &str) -> InvalidAttribute {
    InvalidAttribute::new(
        element_name.into(),
        attribute_name.into(),
        error::ParsedNameOrBytes::new(&attribute.value),
    )
}

/// ensure that an attribute's value is what we expect it to be, otherwise return an error with
/// some location information
fn check_attribute_value(
    att: &Attribute,
    element_name: &str,
    attribute_name: &str,
    expected_attribute_value: &str,
) -> Result<(), error::UnexpectedAttributeValue> {
    if att.value.as_ref() != expected_attribute_value.as_bytes() {
        let unexpected_value = error::UnexpectedAttributeValue {
            element_name: element_name.into(),
            attribute_name: attribute_name.into(),
            expected_value: expected_attribute_value.into(),
            actual_value: error::ParsedNameOrBytes::new(&att.value),
        };

        Err(unexpected_value)
    } else {
        Ok(())
    }
}
