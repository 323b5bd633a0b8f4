//! Ultra HDR container assembly
//!
//! Output layout:
//!
//! ```text
//! primary:  SOI | APP1 XMP (directory) | APP2 MPF | rest of SDR JPEG
//! gain map: SOI | APP1 XMP (hdrgm parameters) | rest of gain map JPEG
//! ```

use anyhow::{anyhow, bail, Result};
use tracing::debug;

use crate::image_pipeline::hdr::types::{GainMapMetadata, GainMapParams, ImageFormat};

const HDRGM_NAMESPACE: &str = "http://ns.adobe.com/hdr-gain-map/1.0/";
const CONTAINER_NAMESPACE: &str = "http://ns.google.com/photos/1.0/container/";
const ITEM_NAMESPACE: &str = "http://ns.google.com/photos/1.0/container/item/";

const XMP_IDENTIFIER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const MPF_IDENTIFIER: &[u8] = b"MPF\0";

const SOI: [u8; 2] = [0xFF, 0xD8];
const APP1: u8 = 0xE1;
const APP2: u8 = 0xE2;

const MPF_VERSION: &[u8; 4] = b"0100";
const TAG_VERSION: u16 = 0xB000;
const TAG_NUMBER_OF_IMAGES: u16 = 0xB001;
const TAG_MP_ENTRY: u16 = 0xB002;
const TYPE_LONG: u16 = 4;
const TYPE_UNDEFINED: u16 = 7;
const MP_ENTRY_SIZE: u32 = 16;
/// TIFF header, entry count, three IFD entries, next-IFD pointer
const MP_ENTRIES_OFFSET: u32 = 8 + 2 + 3 * 12 + 4;
const ATTRIBUTE_PRIMARY: u32 = 0x030000;
const ATTRIBUTE_DEPENDENT: u32 = 0x000000;

pub trait ContainerEmbedder {
    /// Combines the compressed SDR and gain map planes into one file.
    fn embed(
        &self,
        params: &GainMapParams,
        metadata: &GainMapMetadata,
        sdr_jpeg: &[u8],
        gain_map_jpeg: &[u8],
    ) -> Result<Vec<u8>>;
}

/// Writes a JPEG readable by Ultra HDR and Adobe gain map decoders. Plain
/// JPEG readers see the SDR image.
pub struct UltraHdrEmbedder;

impl ContainerEmbedder for UltraHdrEmbedder {
    fn embed(
        &self,
        params: &GainMapParams,
        metadata: &GainMapMetadata,
        sdr_jpeg: &[u8],
        gain_map_jpeg: &[u8],
    ) -> Result<Vec<u8>> {
        check_jpeg(sdr_jpeg, "SDR")?;
        check_jpeg(gain_map_jpeg, "gain map")?;
        debug!(
            "Embedding gain map: max boost {}, {} + {} bytes",
            params.max_content_boost,
            sdr_jpeg.len(),
            gain_map_jpeg.len()
        );

        let gain_map_xmp = app_segment(APP1, XMP_IDENTIFIER, gain_map_xmp(metadata).as_bytes())?;
        let gain_map = insert_after_soi(gain_map_jpeg, &gain_map_xmp);

        let primary_xmp = app_segment(APP1, XMP_IDENTIFIER, primary_xmp(gain_map.len()).as_bytes())?;
        // The MPF segment has a fixed size, so the primary length is known
        // before its offsets are filled in.
        let mpf_len = mpf_segment(0, 0, 0)?.len();
        let primary_len = sdr_jpeg.len() + primary_xmp.len() + mpf_len;
        // Offsets of later images count from the MPF TIFF header: marker,
        // length and identifier precede it.
        let tiff_header = SOI.len() + primary_xmp.len() + 4 + MPF_IDENTIFIER.len();
        let mpf = mpf_segment(primary_len, gain_map.len(), primary_len - tiff_header)?;

        let mut out = Vec::with_capacity(primary_len + gain_map.len());
        out.extend_from_slice(&SOI);
        out.extend_from_slice(&primary_xmp);
        out.extend_from_slice(&mpf);
        out.extend_from_slice(&sdr_jpeg[SOI.len()..]);
        out.extend_from_slice(&gain_map);
        Ok(out)
    }
}

fn check_jpeg(data: &[u8], name: &str) -> Result<()> {
    if data.len() < 4 || data[..2] != SOI {
        bail!("{} stream is not a JPEG", name);
    }
    Ok(())
}

fn insert_after_soi(jpeg: &[u8], segment: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(jpeg.len() + segment.len());
    out.extend_from_slice(&jpeg[..SOI.len()]);
    out.extend_from_slice(segment);
    out.extend_from_slice(&jpeg[SOI.len()..]);
    out
}

fn app_segment(marker: u8, identifier: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    let length = 2 + identifier.len() + payload.len();
    let length = u16::try_from(length).map_err(|_| anyhow!("APP segment of {} bytes is too large", length))?;

    let mut segment = Vec::with_capacity(2 + length as usize);
    segment.extend_from_slice(&[0xFF, marker]);
    segment.extend_from_slice(&length.to_be_bytes());
    segment.extend_from_slice(identifier);
    segment.extend_from_slice(payload);
    Ok(segment)
}

fn mpf_segment(primary_len: usize, gain_map_len: usize, gain_map_offset: usize) -> Result<Vec<u8>> {
    let to_u32 = |v: usize| u32::try_from(v).map_err(|_| anyhow!("{} bytes exceeds MPF range", v));

    let mut mpf = Vec::with_capacity(MP_ENTRIES_OFFSET as usize + 2 * MP_ENTRY_SIZE as usize);
    mpf.extend_from_slice(b"MM\x00\x2A");
    mpf.extend_from_slice(&8u32.to_be_bytes());
    mpf.extend_from_slice(&3u16.to_be_bytes());

    write_ifd_entry(&mut mpf, TAG_VERSION, TYPE_UNDEFINED, 4, u32::from_be_bytes(*MPF_VERSION));
    write_ifd_entry(&mut mpf, TAG_NUMBER_OF_IMAGES, TYPE_LONG, 1, 2);
    write_ifd_entry(&mut mpf, TAG_MP_ENTRY, TYPE_UNDEFINED, 2 * MP_ENTRY_SIZE, MP_ENTRIES_OFFSET);
    mpf.extend_from_slice(&0u32.to_be_bytes());

    write_mp_entry(&mut mpf, ATTRIBUTE_PRIMARY, to_u32(primary_len)?, 0);
    write_mp_entry(&mut mpf, ATTRIBUTE_DEPENDENT, to_u32(gain_map_len)?, to_u32(gain_map_offset)?);

    app_segment(APP2, MPF_IDENTIFIER, &mpf)
}

fn write_ifd_entry(buf: &mut Vec<u8>, tag: u16, type_id: u16, count: u32, value_or_offset: u32) {
    buf.extend_from_slice(&tag.to_be_bytes());
    buf.extend_from_slice(&type_id.to_be_bytes());
    buf.extend_from_slice(&count.to_be_bytes());
    buf.extend_from_slice(&value_or_offset.to_be_bytes());
}

fn write_mp_entry(buf: &mut Vec<u8>, attribute: u32, size: u32, offset: u32) {
    buf.extend_from_slice(&attribute.to_be_bytes());
    buf.extend_from_slice(&size.to_be_bytes());
    buf.extend_from_slice(&offset.to_be_bytes());
    // no dependent images
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
}

fn primary_xmp(gain_map_len: usize) -> String {
    let mime = ImageFormat::Jpeg.mime_type();
    format!(
        r#"<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="Adobe XMP Core">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about=""
        xmlns:hdrgm="{HDRGM_NAMESPACE}"
        xmlns:Container="{CONTAINER_NAMESPACE}"
        xmlns:Item="{ITEM_NAMESPACE}"
        hdrgm:Version="1.0">
      <Container:Directory>
        <rdf:Seq>
          <rdf:li rdf:parseType="Resource">
            <Container:Item Item:Semantic="Primary" Item:Mime="{mime}"/>
          </rdf:li>
          <rdf:li rdf:parseType="Resource">
            <Container:Item Item:Semantic="GainMap" Item:Mime="{mime}" Item:Length="{gain_map_len}"/>
          </rdf:li>
        </rdf:Seq>
      </Container:Directory>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>"#
    )
}

fn gain_map_xmp(metadata: &GainMapMetadata) -> String {
    format!(
        r#"<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="Adobe XMP Core">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about=""
        xmlns:hdrgm="{HDRGM_NAMESPACE}"
        hdrgm:Version="1.0"
        hdrgm:GainMapMin="{}"
        hdrgm:GainMapMax="{}"
        hdrgm:Gamma="{}"
        hdrgm:OffsetSDR="{}"
        hdrgm:OffsetHDR="{}"
        hdrgm:HDRCapacityMin="{:.6}"
        hdrgm:HDRCapacityMax="{:.6}"
        hdrgm:BaseRenditionIsHDR="False"/>
  </rdf:RDF>
</x:xmpmeta>"#,
        format_channels(&metadata.gain_map_min),
        format_channels(&metadata.gain_map_max),
        format_channels(&metadata.gamma),
        format_channels(&metadata.offset_sdr),
        format_channels(&metadata.offset_hdr),
        metadata.hdr_capacity_min,
        metadata.hdr_capacity_max,
    )
}

/// One value when all channels agree, otherwise three.
fn format_channels(values: &[f32; 3]) -> String {
    if values[0] == values[1] && values[1] == values[2] {
        format!("{:.6}", values[0])
    } else {
        format!("{:.6}, {:.6}, {:.6}", values[0], values[1], values[2])
    }
}
