use std::{env, fs::File, io::BufReader};

use anyhow::bail;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    let (strict, path) = match &*args {
        [path] => (true, path),
        [flag, path] if flag == "--lenient" => (false, path),
        _ => bail!("usage: dump [--lenient] <file.jpg>"),
    };

    let file = BufReader::new(File::open(path)?);
    let doc = jpeg_segments::open(file, strict)?;

    for com in doc.comments() {
        println!("COM {:?}", com.text());
    }
    for table in doc.tables().quantization().iter() {
        println!("DQT Tq={} Pq={}", table.Tq(), table.Pq());
    }
    for table in doc.tables().huffman().iter() {
        let defs = doc
            .tables()
            .huffman_history(table.Th())
            .map_or(0, |history| history.len());
        println!(
            "DHT Th={} Tc={} {} codes, {} definitions",
            table.Th(),
            table.Tc(),
            table.Vij().len(),
            defs,
        );
    }
    if let Some(ri) = doc.restart_interval() {
        println!("DRI Ri={ri}");
    }
    for frame in doc.frames() {
        println!(
            "{:?} {}x{}, {}-bit",
            frame.sof(),
            frame.X(),
            frame.Y(),
            frame.P()
        );
        for c in frame.components() {
            println!(
                "  component {}: {}x{} sampling, Tq={}",
                c.Ci(),
                c.Hi(),
                c.Vi(),
                c.Tqi()
            );
        }
        for (i, scan) in frame.scans().iter().enumerate() {
            let ids = scan
                .components()
                .iter()
                .map(|c| c.Csj().to_string())
                .collect::<Vec<_>>()
                .join(",");
            println!(
                "  scan {i}: components [{ids}], Ss={} Se={} Ah={} Al={}",
                scan.Ss(),
                scan.Se(),
                scan.Ah(),
                scan.Al()
            );
        }
    }

    Ok(())
}
