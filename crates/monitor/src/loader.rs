//! Guest image loading.
//!
//! ELF files have their `PT_LOAD` segments copied to their physical addresses
//! and their symbol table installed for the call tracer and for symbol names
//! in expressions. Anything else is copied verbatim to the memory base.

use anyhow::{bail, Context, Result};
use camino::Utf8Path;
use elf::abi::{PT_LOAD, STT_FUNC, STT_OBJECT};
use elf::endian::AnyEndian;
use elf::ElfBytes;
use riscv_core::{Emulator, Symbol, SymbolKind, SymbolTable};
use tracing::{info, warn};

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// Program loaded when no image is given: stores to and reloads from its own
/// data word, then traps with `a0 = 0`.
pub const BUILTIN_IMAGE: [u32; 5] = [
    0x0000_0297, // auipc t0, 0
    0x0002_8823, // sb    zero, 16(t0)
    0x0102_c503, // lbu   a0, 16(t0)
    0x0010_0073, // ebreak
    0xdead_beef, // data
];

/// How an image was recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// ELF executable.
    Elf,
    /// Flat binary.
    Raw,
    /// [`BUILTIN_IMAGE`].
    Builtin,
}

/// Summary of a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedImage {
    /// Image format.
    pub kind: ImageKind,
    /// Initial program counter.
    pub entry: u32,
    /// Bytes copied into guest memory.
    pub bytes: usize,
    /// Symbols installed.
    pub symbols: usize,
}

/// Loads `path`, or [`BUILTIN_IMAGE`] when `path` is `None`.
///
/// # Errors
///
/// Fails when the file cannot be read or does not fit in guest memory.
pub fn load(emu: &mut Emulator, path: Option<&Utf8Path>) -> Result<LoadedImage> {
    let Some(path) = path else {
        info!("no image given, loading the built-in program");
        return load_builtin(emu);
    };
    let data = std::fs::read(path).with_context(|| format!("failed to read image {path}"))?;
    load_bytes(emu, &data).with_context(|| format!("failed to load image {path}"))
}

/// Loads an in-memory image, detecting ELF by its magic number.
///
/// # Errors
///
/// Fails on malformed ELF files and on images that do not fit in memory.
pub fn load_bytes(emu: &mut Emulator, data: &[u8]) -> Result<LoadedImage> {
    if data.starts_with(ELF_MAGIC) {
        load_elf(emu, data)
    } else {
        load_raw(emu, data)
    }
}

/// Copies `data` to the memory base; execution starts there.
///
/// # Errors
///
/// Fails when `data` does not fit in guest memory.
pub fn load_raw(emu: &mut Emulator, data: &[u8]) -> Result<LoadedImage> {
    let base = emu.config().memory_base;
    emu.load_image(base, data)?;
    emu.registers_mut().set_pc(base);
    Ok(LoadedImage {
        kind: ImageKind::Raw,
        entry: base,
        bytes: data.len(),
        symbols: 0,
    })
}

/// Loads [`BUILTIN_IMAGE`] at the memory base.
///
/// # Errors
///
/// Fails when guest memory is smaller than the program.
pub fn load_builtin(emu: &mut Emulator) -> Result<LoadedImage> {
    let image: Vec<u8> = BUILTIN_IMAGE
        .iter()
        .flat_map(|word| word.to_le_bytes())
        .collect();
    let loaded = load_raw(emu, &image)?;
    Ok(LoadedImage {
        kind: ImageKind::Builtin,
        ..loaded
    })
}

/// Loads the `PT_LOAD` segments and symbols of an ELF file.
///
/// # Errors
///
/// Fails on parse errors, addresses beyond 32 bits, and segments outside
/// guest memory.
pub fn load_elf(emu: &mut Emulator, data: &[u8]) -> Result<LoadedImage> {
    let file = ElfBytes::<AnyEndian>::minimal_parse(data).context("invalid ELF file")?;
    let entry = u32::try_from(file.ehdr.e_entry).context("ELF entry point beyond 32 bits")?;

    let Some(segments) = file.segments() else {
        bail!("ELF file has no program headers");
    };
    let mut bytes = 0;
    for phdr in segments.iter().filter(|phdr| phdr.p_type == PT_LOAD) {
        let addr = u32::try_from(phdr.p_paddr).context("segment address beyond 32 bits")?;
        let contents = file
            .segment_data(&phdr)
            .context("failed to read segment data")?;
        emu.load_image(addr, contents)
            .with_context(|| format!("segment at {addr:#010x} does not fit in memory"))?;

        let memsz = usize::try_from(phdr.p_memsz).context("segment size overflow")?;
        if memsz > contents.len() {
            let fill_at = addr.wrapping_add(u32::try_from(contents.len())?);
            emu.load_image(fill_at, &vec![0; memsz - contents.len()])
                .with_context(|| format!("zero fill at {fill_at:#010x} does not fit in memory"))?;
        }
        info!(
            addr = format_args!("{addr:#010x}"),
            filesz = contents.len(),
            memsz,
            "loaded segment"
        );
        bytes += memsz.max(contents.len());
    }

    let symbols = read_symbols(&file)?;
    let count = symbols.len();
    emu.set_symbols(symbols);
    emu.registers_mut().set_pc(entry);

    Ok(LoadedImage {
        kind: ImageKind::Elf,
        entry,
        bytes,
        symbols: count,
    })
}

fn read_symbols(file: &ElfBytes<'_, AnyEndian>) -> Result<SymbolTable> {
    let Some((symtab, strtab)) = file.symbol_table().context("invalid symbol table")? else {
        warn!("no symbol table found in ELF file");
        return Ok(SymbolTable::default());
    };

    let mut symbols = Vec::new();
    for symbol in symtab.iter() {
        if symbol.st_name == 0 {
            continue;
        }
        let name = strtab
            .get(symbol.st_name as usize)
            .context("invalid symbol name")?;
        let kind = match symbol.st_symtype() {
            STT_FUNC => SymbolKind::Function,
            STT_OBJECT => SymbolKind::Object,
            _ => SymbolKind::Other,
        };
        let (Ok(address), Ok(size)) = (
            u32::try_from(symbol.st_value),
            u32::try_from(symbol.st_size),
        ) else {
            continue;
        };
        symbols.push(Symbol::new(name, address, size, kind));
    }
    Ok(SymbolTable::new(symbols))
}
