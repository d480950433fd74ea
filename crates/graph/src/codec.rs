//! Binary graph-program codec.
//!
//! Layout: magic `GP01`, version byte, placeholder table, post-order node
//! table, root index, CRC32 (little-endian) over every preceding byte.
//! Integers are unsigned LEB128 varints. Traversal order is fixed (depth
//! first, sources in order, shared nodes emitted once), so equal programs
//! encode byte-identically and the encoding can serve as a content
//! identity.

use std::collections::HashMap;
use std::sync::Arc;

use crate::dtype::DType;
use crate::error::DecodeError;
use crate::node::{GraphNode, OpKind, PlaceholderInfo};
use crate::program::GraphProgram;
use crate::shape::{ShapeTracker, ViewLayout};

const MAGIC: &[u8; 4] = b"GP01";
const VERSION: u8 = 1;

const KIND_BUFFER: u8 = 0;
const KIND_VIEW: u8 = 1;
const KIND_OP: u8 = 2;

pub fn encode_program(program: &GraphProgram) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.push(VERSION);

    write_varint(&mut out, program.placeholders.len() as u64);
    for info in &program.placeholders {
        write_varint(&mut out, info.name.len() as u64);
        out.extend_from_slice(info.name.as_bytes());
        out.push(info.dtype.code());
        write_varint(&mut out, info.shape.len() as u64);
        for &dim in &info.shape {
            write_varint(&mut out, dim);
        }
    }

    // Linearize post-order; every shared node appears exactly once.
    let mut order: Vec<&Arc<GraphNode>> = Vec::new();
    let mut index_of: HashMap<u64, u64> = HashMap::new();
    linearize(&program.root, &mut order, &mut index_of);

    let mut body = Vec::new();
    write_varint(&mut body, order.len() as u64);
    for node in &order {
        encode_node(node, &program.placeholders, &index_of, &mut body);
    }
    write_varint(&mut body, index_of[&program.root.id()]);
    out.extend_from_slice(&body);

    let checksum = crc32fast::hash(&out);
    out.extend_from_slice(&checksum.to_le_bytes());
    out
}

fn linearize<'a>(
    node: &'a Arc<GraphNode>,
    order: &mut Vec<&'a Arc<GraphNode>>,
    index_of: &mut HashMap<u64, u64>,
) {
    if index_of.contains_key(&node.id()) {
        return;
    }
    for source in node.sources() {
        linearize(source, order, index_of);
    }
    index_of.insert(node.id(), order.len() as u64);
    order.push(node);
}

fn encode_node(
    node: &GraphNode,
    placeholders: &[PlaceholderInfo],
    index_of: &HashMap<u64, u64>,
    out: &mut Vec<u8>,
) {
    match node {
        GraphNode::Buffer {
            device,
            size,
            dtype,
            placeholder,
            ..
        } => {
            out.push(KIND_BUFFER);
            out.push(dtype.code());
            write_varint(out, 0);
            write_varint(out, *size);
            write_varint(out, device.len() as u64);
            out.extend_from_slice(device.as_bytes());
            match placeholder {
                Some(info) => {
                    let index = placeholders
                        .iter()
                        .position(|p| p.name == info.name)
                        .expect("placeholder is declared in the manifest");
                    out.push(1);
                    write_varint(out, index as u64);
                }
                None => out.push(0),
            }
        }
        GraphNode::View {
            source,
            tracker,
            dtype,
            ..
        } => {
            out.push(KIND_VIEW);
            out.push(dtype.code());
            write_varint(out, 1);
            write_varint(out, index_of[&source.id()]);
            encode_tracker(tracker, out);
        }
        GraphNode::Op {
            kind,
            sources,
            dtype,
            ..
        } => {
            out.push(KIND_OP);
            out.push(dtype.code());
            write_varint(out, sources.len() as u64);
            for source in sources {
                write_varint(out, index_of[&source.id()]);
            }
            out.push(kind.code());
        }
    }
}

fn encode_tracker(tracker: &ShapeTracker, out: &mut Vec<u8>) {
    write_varint(out, tracker.views.len() as u64);
    for view in &tracker.views {
        write_varint(out, view.shape.len() as u64);
        for &dim in &view.shape {
            write_varint(out, dim);
        }
        for &stride in &view.strides {
            write_varint(out, stride);
        }
        write_varint(out, view.offset);
        match &view.mask {
            Some(mask) => {
                out.push(1);
                for &(lo, hi) in mask {
                    write_varint(out, lo);
                    write_varint(out, hi);
                }
            }
            None => out.push(0),
        }
    }
}

pub fn decode_program(data: &[u8]) -> Result<GraphProgram, DecodeError> {
    if data.len() < MAGIC.len() + 1 {
        return Err(DecodeError::TruncatedPayload("shorter than header".into()));
    }
    if &data[..4] != MAGIC {
        return Err(DecodeError::BadMagic);
    }
    if data[4] != VERSION {
        return Err(DecodeError::UnsupportedVersion(data[4]));
    }
    if data.len() < 4 + 1 + 4 {
        return Err(DecodeError::TruncatedPayload("missing checksum".into()));
    }

    let body_end = data.len() - 4;
    let stored = u32::from_le_bytes([
        data[body_end],
        data[body_end + 1],
        data[body_end + 2],
        data[body_end + 3],
    ]);
    let computed = crc32fast::hash(&data[..body_end]);
    if stored != computed {
        return Err(DecodeError::ChecksumMismatch { stored, computed });
    }

    let mut reader = Reader {
        data: &data[..body_end],
        pos: 5,
    };

    let placeholder_count = reader.read_varint()? as usize;
    let mut placeholders = Vec::with_capacity(placeholder_count);
    for _ in 0..placeholder_count {
        let name_len = reader.read_varint()? as usize;
        let name = String::from_utf8(reader.read_bytes(name_len)?.to_vec())
            .map_err(|_| DecodeError::TruncatedPayload("placeholder name is not UTF-8".into()))?;
        let dtype = DType::from_code(reader.read_u8()?)?;
        let shape_len = reader.read_varint()? as usize;
        let mut shape = Vec::with_capacity(shape_len);
        for _ in 0..shape_len {
            shape.push(reader.read_varint()?);
        }
        placeholders.push(PlaceholderInfo { name, shape, dtype });
    }

    let node_count = reader.read_varint()? as usize;
    let mut nodes: Vec<Arc<GraphNode>> = Vec::with_capacity(node_count);
    for position in 0..node_count {
        let kind = reader.read_u8()?;
        let dtype = DType::from_code(reader.read_u8()?)?;
        let operand_count = reader.read_varint()? as usize;
        let mut operands = Vec::with_capacity(operand_count);
        for _ in 0..operand_count {
            let index = reader.read_varint()? as usize;
            if index >= position {
                return Err(DecodeError::CycleDetected(position));
            }
            operands.push(Arc::clone(&nodes[index]));
        }

        let node = match kind {
            KIND_BUFFER => {
                let size = reader.read_varint()?;
                let device_len = reader.read_varint()? as usize;
                let device = String::from_utf8(reader.read_bytes(device_len)?.to_vec())
                    .map_err(|_| DecodeError::TruncatedPayload("device is not UTF-8".into()))?;
                let placeholder = match reader.read_u8()? {
                    0 => None,
                    _ => {
                        let index = reader.read_varint()? as usize;
                        let info = placeholders.get(index).ok_or(
                            DecodeError::PlaceholderMismatch {
                                index,
                                count: placeholders.len(),
                            },
                        )?;
                        Some(info.clone())
                    }
                };
                GraphNode::Buffer {
                    id: position as u64,
                    device,
                    size,
                    dtype,
                    placeholder,
                }
            }
            KIND_VIEW => {
                let tracker = decode_tracker(&mut reader)?;
                let source = operands.into_iter().next().ok_or_else(|| {
                    DecodeError::TruncatedPayload("view without a source".into())
                })?;
                GraphNode::View {
                    id: position as u64,
                    source,
                    tracker,
                    dtype,
                }
            }
            KIND_OP => {
                let code = reader.read_u8()?;
                let kind = OpKind::from_code(code).ok_or_else(|| {
                    DecodeError::TruncatedPayload(format!("unknown op code {}", code))
                })?;
                GraphNode::Op {
                    id: position as u64,
                    kind,
                    sources: operands,
                    dtype,
                }
            }
            other => {
                return Err(DecodeError::TruncatedPayload(format!(
                    "unknown node kind {}",
                    other
                )))
            }
        };
        nodes.push(Arc::new(node));
    }

    let root_index = reader.read_varint()? as usize;
    let root = nodes
        .get(root_index)
        .cloned()
        .ok_or_else(|| DecodeError::TruncatedPayload("root index out of range".into()))?;

    if reader.pos != reader.data.len() {
        return Err(DecodeError::TruncatedPayload("trailing bytes".into()));
    }

    Ok(GraphProgram {
        root,
        placeholders,
        constants: HashMap::new(),
    })
}

fn decode_tracker(reader: &mut Reader<'_>) -> Result<ShapeTracker, DecodeError> {
    let view_count = reader.read_varint()? as usize;
    if view_count == 0 {
        return Err(DecodeError::TruncatedPayload("tracker without views".into()));
    }
    let mut views = Vec::with_capacity(view_count);
    for _ in 0..view_count {
        let ndim = reader.read_varint()? as usize;
        let mut shape = Vec::with_capacity(ndim);
        for _ in 0..ndim {
            shape.push(reader.read_varint()?);
        }
        let mut strides = Vec::with_capacity(ndim);
        for _ in 0..ndim {
            strides.push(reader.read_varint()?);
        }
        let offset = reader.read_varint()?;
        let mask = match reader.read_u8()? {
            0 => None,
            _ => {
                let mut ranges = Vec::with_capacity(ndim);
                for _ in 0..ndim {
                    let lo = reader.read_varint()?;
                    let hi = reader.read_varint()?;
                    ranges.push((lo, hi));
                }
                Some(ranges)
            }
        };
        views.push(ViewLayout {
            shape,
            strides,
            offset,
            mask,
        });
    }
    Ok(ShapeTracker { views })
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| DecodeError::TruncatedPayload("unexpected end of input".into()))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&[u8], DecodeError> {
        if self.pos + len > self.data.len() {
            return Err(DecodeError::TruncatedPayload("unexpected end of input".into()));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            if shift >= 64 {
                return Err(DecodeError::TruncatedPayload("varint overflow".into()));
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }
}
