//! Class file header reader.
//!
//! Reads just enough of a `.class` buffer to know which class it defines:
//! the version, access flags, this/super class and interfaces. Used to check
//! a bytecode payload against the name it is registered under before handing
//! it to `DefineClass`.

/// Errors from [`ClassHeader::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassFileError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid magic: {0:#x}")]
    InvalidMagic(u32),
    #[error("invalid constant pool index: {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("invalid constant pool tag: {0}")]
    InvalidConstantPoolTag(u8),
    #[error("class file defines {found}, expected {expected}")]
    NameMismatch { expected: String, found: String },
}

pub const MAGIC: u32 = 0xCAFE_BABE;

/// The leading, fixed part of a class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    /// Internal name, e.g. `com/example/Widget`.
    pub this_class: String,
    /// `None` only for `java/lang/Object` and module-info.
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
}

impl ClassHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassFileError> {
        let mut r = Reader::new(bytes);
        let magic = r.read_u4()?;
        if magic != MAGIC {
            return Err(ClassFileError::InvalidMagic(magic));
        }
        let minor_version = r.read_u2()?;
        let major_version = r.read_u2()?;
        let pool = parse_constant_pool(&mut r)?;

        let access_flags = r.read_u2()?;
        let this_class = pool.class_name(r.read_u2()?)?.to_string();
        let super_index = r.read_u2()?;
        let super_class = match super_index {
            0 => None,
            i => Some(pool.class_name(i)?.to_string()),
        };
        let count = r.read_u2()?;
        let mut interfaces = Vec::with_capacity(count as usize);
        for _ in 0..count {
            interfaces.push(pool.class_name(r.read_u2()?)?.to_string());
        }

        Ok(ClassHeader { minor_version, major_version, access_flags, this_class, super_class, interfaces })
    }

    /// Dotted name of the defined class.
    pub fn binary_name(&self) -> String {
        self.this_class.replace('/', ".")
    }

    /// Fails unless the class file defines `expected` (dotted or internal form).
    pub fn expect_name(&self, expected: &str) -> Result<(), ClassFileError> {
        if self.this_class == expected.replace('.', "/") {
            return Ok(());
        }
        Err(ClassFileError::NameMismatch { expected: expected.to_string(), found: self.binary_name() })
    }
}

enum Constant {
    Utf8(String),
    Class(u16),
    Other,
}

struct ConstantPool {
    entries: Vec<Option<Constant>>,
}

impl ConstantPool {
    fn get(&self, index: u16) -> Result<&Constant, ClassFileError> {
        self.entries
            .get(index as usize)
            .and_then(Option::as_ref)
            .ok_or(ClassFileError::InvalidConstantPoolIndex(index))
    }

    fn class_name(&self, index: u16) -> Result<&str, ClassFileError> {
        let Constant::Class(name_index) = self.get(index)? else {
            return Err(ClassFileError::InvalidConstantPoolIndex(index));
        };
        match self.get(*name_index)? {
            Constant::Utf8(s) => Ok(s),
            _ => Err(ClassFileError::InvalidConstantPoolIndex(*name_index)),
        }
    }
}

fn parse_constant_pool(r: &mut Reader) -> Result<ConstantPool, ClassFileError> {
    let count = r.read_u2()? as usize;
    let mut entries: Vec<Option<Constant>> = Vec::with_capacity(count);
    entries.push(None); // index 0 is unused

    while entries.len() < count {
        let tag = r.read_u1()?;
        let entry = match tag {
            1 => {
                let len = r.read_u2()? as usize;
                Constant::Utf8(String::from_utf8_lossy(r.read_bytes(len)?).into_owned())
            }
            7 => Constant::Class(r.read_u2()?),
            3 | 4 => {
                r.read_bytes(4)?;
                Constant::Other
            }
            // Longs and doubles take two slots.
            5 | 6 => {
                r.read_bytes(8)?;
                entries.push(Some(Constant::Other));
                entries.push(None);
                continue;
            }
            8 | 16 | 19 | 20 => {
                r.read_bytes(2)?;
                Constant::Other
            }
            9 | 10 | 11 | 12 | 17 | 18 => {
                r.read_bytes(4)?;
                Constant::Other
            }
            15 => {
                r.read_bytes(3)?;
                Constant::Other
            }
            _ => return Err(ClassFileError::InvalidConstantPoolTag(tag)),
        };
        entries.push(Some(entry));
    }

    Ok(ConstantPool { entries })
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(ClassFileError::UnexpectedEof);
        };
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u1(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u2(&mut self) -> Result<u16, ClassFileError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u4(&mut self) -> Result<u32, ClassFileError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
