use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use serde::{Deserialize, Serialize};

use super::array::Precision;
use super::VtrFile;
use crate::Error;

/// the encoding to use when writing data arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// whitespace separated numbers inside each `DataArray`
    Ascii,
    /// base64 encoded blocks inside each `DataArray`
    Base64,
    /// raw little endian blocks in the `AppendedData` section
    #[default]
    Appended,
}

impl Encoding {
    /// value of the `format` attribute
    fn to_str(&self) -> &'static str {
        match &self {
            Self::Ascii => "ascii",
            Self::Base64 => "binary",
            Self::Appended => "appended",
        }
    }
}

impl std::str::FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ascii" => Ok(Self::Ascii),
            "base64" | "binary" => Ok(Self::Base64),
            "appended" | "raw" => Ok(Self::Appended),
            other => Err(format!(
                "`{}` is not an encoding, expected ascii, base64 or appended",
                other
            )),
        }
    }
}

/// one array as it is laid out in the file
struct ArrayRef<'a> {
    name: &'a str,
    components: usize,
    precision: Precision,
    values: &'a [f64],
}

/// Write a rectilinear grid file to a `Write`r
pub fn write_vtr<W: Write>(writer: W, file: &VtrFile, encoding: Encoding) -> Result<(), Error> {
    let mut writer = Writer::new_with_indent(writer, b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer.write_event(Event::Start(BytesStart::new("VTKFile").with_attributes([
        ("type", "RectilinearGrid"),
        ("version", "1.0"),
        ("byte_order", "LittleEndian"),
        ("header_type", "UInt64"),
    ])))?;

    // output the spans
    let span_str = file.extent.to_string();

    writer.write_event(Event::Start(
        BytesStart::new("RectilinearGrid").with_attributes([("WholeExtent", span_str.as_str())]),
    ))?;
    writer.write_event(Event::Start(
        BytesStart::new("Piece").with_attributes([("Extent", span_str.as_str())]),
    ))?;

    let coordinates = [
        ("X", &file.mesh.x_locations),
        ("Y", &file.mesh.y_locations),
        ("Z", &file.mesh.z_locations),
    ]
    .map(|(name, values)| ArrayRef {
        name,
        components: 1,
        precision: Precision::Float64,
        values: values.as_slice(),
    });

    let point_data = file.point_data.iter().map(|array| ArrayRef {
        name: &array.name,
        components: array.components,
        precision: array.precision,
        values: &array.values,
    });

    // blocks that go to the appended section, in offset order
    let mut appended = Vec::new();
    let mut offset = 0u64;

    writer.write_event(Event::Start(BytesStart::new("Coordinates")))?;
    for array in &coordinates {
        write_dataarray(&mut writer, array, encoding, &mut offset, &mut appended)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Coordinates")))?;

    writer.write_event(Event::Start(BytesStart::new("PointData")))?;
    for array in point_data {
        write_dataarray(&mut writer, &array, encoding, &mut offset, &mut appended)?;
    }
    writer.write_event(Event::End(BytesEnd::new("PointData")))?;

    writer.write_event(Event::End(BytesEnd::new("Piece")))?;
    writer.write_event(Event::End(BytesEnd::new("RectilinearGrid")))?;

    if !appended.is_empty() {
        writer.write_event(Event::Start(
            BytesStart::new("AppendedData").with_attributes([("encoding", "raw")]),
        ))?;

        // every block is its byte count followed by the data
        let inner = writer.inner();
        inner.write_all(b"_")?;
        for block in &appended {
            inner.write_all(&(block.len() as u64).to_le_bytes())?;
            inner.write_all(block)?;
        }

        writer.write_event(Event::End(BytesEnd::new("AppendedData")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("VTKFile")))?;

    Ok(())
}

fn write_dataarray<W: Write>(
    writer: &mut Writer<W>,
    array: &ArrayRef,
    encoding: Encoding,
    offset: &mut u64,
    appended: &mut Vec<Vec<u8>>,
) -> Result<(), Error> {
    let components = array.components.to_string();

    let mut header = BytesStart::new("DataArray").with_attributes([
        ("type", array.precision.to_str()),
        ("Name", array.name),
        ("NumberOfComponents", components.as_str()),
        ("format", encoding.to_str()),
    ]);

    let unrepresentable = |source| Error::Unrepresentable {
        array: array.name.to_string(),
        source,
    };

    match encoding {
        Encoding::Ascii => {
            let data = array
                .precision
                .format_ascii(array.values)
                .map_err(unrepresentable)?;

            writer.write_event(Event::Start(header))?;
            writer.write_event(Event::Text(BytesText::new(data.trim_end())))?;
            writer.write_event(Event::End(BytesEnd::new("DataArray")))?;
        }
        Encoding::Base64 => {
            let bytes = array.precision.encode(array.values).map_err(unrepresentable)?;

            let mut block = Vec::with_capacity(bytes.len() + 8);
            block.extend((bytes.len() as u64).to_le_bytes());
            block.extend(bytes);

            // encode as base64
            let data = base64::encode(&block);

            writer.write_event(Event::Start(header))?;
            writer.write_event(Event::Text(BytesText::new(&data)))?;
            writer.write_event(Event::End(BytesEnd::new("DataArray")))?;
        }
        Encoding::Appended => {
            let bytes = array.precision.encode(array.values).map_err(unrepresentable)?;

            header.push_attribute(("offset", offset.to_string().as_str()));
            writer.write_event(Event::Empty(header))?;

            *offset += 8 + bytes.len() as u64;
            appended.push(bytes);
        }
    }

    Ok(())
}
