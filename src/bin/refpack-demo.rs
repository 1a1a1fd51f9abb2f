use std::{
    env,
    error::Error,
    ffi::OsString,
    fs::File,
    io::{BufReader, BufWriter, Write},
};

use refpack_rs::*;

#[cfg(feature = "std")]
fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<OsString> = env::args_os().collect();

    if args.len() < 4 {
        println!("Usage: {} c|d input output", args[0].to_string_lossy());
        println!("Inputs not worth compressing are stored as-is by c; d cannot read those back");
        return Ok(());
    }

    let mode = &args[1];
    let inp_fn = &args[2];
    let outp_fn = &args[3];

    let outp = match mode.to_str() {
        Some("c") => {
            let inp = std::fs::read(inp_fn)?;
            let mut cmp = CompressState::new();
            match cmp.compress_to_vec(&inp, CompressionLevel::MAX) {
                Ok(outp) => outp,
                Err(CompressError::NotWorthCompressing) => {
                    println!("Input is not worth compressing, storing as-is (not a RefPack stream)");
                    inp
                }
                Err(e) => return Err(e.into()),
            }
        }
        Some("d") => decompress_from_reader(BufReader::new(File::open(inp_fn)?))?,
        _ => {
            println!("Invalid mode {}", mode.to_string_lossy());
            return Ok(());
        }
    };

    let mut outp_f = BufWriter::new(File::create(outp_fn)?);
    outp_f.write_all(&outp)?;
    outp_f.flush()?;

    Ok(())
}

#[cfg(not(feature = "std"))]
fn main() {
    println!("Demo requires std feature");
}
