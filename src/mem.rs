//! Simulated console RAM.
//!
//! All persistent game state lives in a flat byte array handed out by a bump
//! allocator. Typed views ([`Field`], [`EnumField`], [`BitArray`]) only hold an
//! address and a mask, and read or write through a [`Memory`] reference.

use std::fmt;
use std::io;
use std::marker::PhantomData;

use log::{debug, trace};

use crate::error::{Error, Result};

/// Address of a byte in simulated RAM.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub u16);

impl Address {
    pub fn offset(self, bytes: usize) -> Address {
        Address(self.0 + bytes as u16)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${:04x}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${:04x}", self.0)
    }
}

/// Largest RAM size. The address one past the last byte must still fit in
/// 16 bits.
pub const MAX_RAM_SIZE: usize = 0xffff;

pub struct Memory {
    data: Vec<u8>,
    // Next free byte. Addresses are never reused.
    next: usize,
}

impl Memory {
    pub fn new(size: usize) -> Memory {
        assert!(size <= MAX_RAM_SIZE, "RAM larger than the 16-bit address space");
        Memory {
            data: vec![0u8; size],
            next: 0,
        }
    }

    /// Reserve `len` contiguous bytes, zero-initialized.
    pub fn alloc(&mut self, len: usize) -> Result<Address> {
        let available = self.available();
        if len > available {
            return Err(Error::OutOfMemory {
                requested: len,
                available,
            });
        }

        let addr = Address(self.next as u16);
        self.next += len;
        trace!("allocated {} bytes at {}", len, addr);

        Ok(addr)
    }

    /// Reserve one byte and return a field of `width` bits at its bottom.
    pub fn alloc_field(&mut self, width: u8) -> Result<Field> {
        let addr = self.alloc(1)?;
        Ok(Field::new(addr, width, 0))
    }

    /// Reserve enough bytes for `len` bits.
    pub fn alloc_bits(&mut self, len: usize) -> Result<BitArray> {
        let addr = self.alloc(BitArray::byte_len_for(len))?;
        Ok(BitArray::new(addr, len))
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn used(&self) -> usize {
        self.next
    }

    pub fn available(&self) -> usize {
        self.data.len() - self.next
    }

    pub fn read(&self, addr: Address) -> u8 {
        self.data[addr.index()]
    }

    pub fn write(&mut self, addr: Address, value: u8) {
        self.data[addr.index()] = value;
    }

    pub fn bytes(&self, addr: Address, len: usize) -> &[u8] {
        &self.data[addr.index()..addr.index() + len]
    }

    /// Copy `len` bytes from `src` to `dst` without interpreting them.
    pub fn copy(&mut self, src: Address, dst: Address, len: usize) {
        debug!("copy {} bytes {} -> {}", len, src, dst);
        let src = src.index();
        self.data.copy_within(src..src + len, dst.index());
    }

    /// Write a hex dump of the allocated part of RAM.
    pub fn dump<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        for (i, row) in self.data[..self.next].chunks(16).enumerate() {
            write!(out, "{}:", Address((i * 16) as u16))?;
            for byte in row {
                write!(out, " {:02x}", byte)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

/// A bit field of up to 8 bits inside one byte.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Field {
    addr: Address,
    shift: u8,
    mask: u8,
}

impl Field {
    pub fn new(addr: Address, width: u8, shift: u8) -> Field {
        assert!(width >= 1 && width + shift <= 8);
        Field {
            addr,
            shift,
            mask: (0xffu16 >> (8 - width)) as u8,
        }
    }

    pub fn get(&self, mem: &Memory) -> u8 {
        (mem.read(self.addr) >> self.shift) & self.mask
    }

    /// Read-modify-write. Bits of `value` above the field width are dropped.
    pub fn set(&self, mem: &mut Memory, value: u8) {
        let byte = mem.read(self.addr) & !(self.mask << self.shift);
        mem.write(self.addr, byte | ((value & self.mask) << self.shift));
    }
}

/// A closed enumeration stored in a small integer field.
pub trait FieldEnum: Copy + Sized {
    const NAME: &'static str;

    fn from_bits(bits: u8) -> Option<Self>;
    fn bits(self) -> u8;
}

#[derive(Clone, Copy, Debug)]
pub struct EnumField<T> {
    field: Field,
    _type: PhantomData<T>,
}

impl<T: FieldEnum> EnumField<T> {
    pub fn new(field: Field) -> Self {
        EnumField {
            field,
            _type: PhantomData,
        }
    }

    pub fn get(&self, mem: &Memory) -> Result<T> {
        let value = self.field.get(mem);
        T::from_bits(value).ok_or(Error::InvalidEnumValue {
            name: T::NAME,
            value,
        })
    }

    pub fn set(&self, mem: &mut Memory, value: T) {
        self.field.set(mem, value.bits());
    }
}

/// Array of single bits, rounded up to whole bytes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BitArray {
    addr: Address,
    len: usize,
}

impl BitArray {
    pub fn new(addr: Address, len: usize) -> Self {
        BitArray { addr, len }
    }

    pub fn byte_len_for(len: usize) -> usize {
        (len + 7) / 8
    }

    pub fn address(&self) -> Address {
        self.addr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn byte_len(&self) -> usize {
        Self::byte_len_for(self.len)
    }

    fn locate(&self, index: usize) -> Field {
        assert!(
            index < self.len,
            "bit {} out of range ({} bits)",
            index,
            self.len
        );
        Field::new(self.addr.offset(index / 8), 1, (index % 8) as u8)
    }

    pub fn get(&self, mem: &Memory, index: usize) -> bool {
        self.locate(index).get(mem) != 0
    }

    pub fn set(&self, mem: &mut Memory, index: usize, value: bool) {
        self.locate(index).set(mem, value as u8);
    }

    pub fn clear(&self, mem: &mut Memory) {
        for i in 0..self.byte_len() {
            mem.write(self.addr.offset(i), 0);
        }
    }

    pub fn count_ones(&self, mem: &Memory) -> usize {
        (0..self.len).filter(|&i| self.get(mem, i)).count()
    }
}
