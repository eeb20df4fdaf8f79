//! Print every rank's slab of a small 2D array before and after X1 -> Y1.
//!
//! ```text
//! cargo run --example pencil_dump -- [nprocs] [gx] [gy]
//! ```

use pencil_decomp::prelude::*;
use std::fmt::Write as _;

fn arg(n: usize, default: usize) -> usize {
    std::env::args()
        .nth(n)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn dump(out: &mut String, block: &PencilBlock, values: &[f64]) {
    let shape = block.memory_shape();
    let _ = writeln!(
        out,
        "  {} sizes {:?} offsets {:?}",
        block.pencil(),
        block.sizes(),
        block.offsets()
    );
    for row in values.chunks(shape[0]) {
        let line: Vec<String> = row.iter().map(|v| format!("{v:3}")).collect();
        let _ = writeln!(out, "    {}", line.join(" "));
    }
}

fn main() -> Result<(), DecompError> {
    let nprocs = arg(1, 2);
    let glsizes = [arg(2, 4), arg(3, 5)];
    let reports = ThreadComm::run(nprocs, |comm| -> Result<String, DecompError> {
        let decomp = Decomposition::construct(comm, &DecompConfig::new(2))?;
        let x1 = decomp.pencil_block(Pencil::X1, &glsizes)?;
        let y1 = decomp.pencil_block(Pencil::Y1, &glsizes)?;
        let plan = TransposePlan::construct(&decomp, Pencil::X1, Pencil::Y1, &glsizes, 8)?;
        let src: Vec<f64> = (0..x1.len()).map(|i| x1.global_index(i) as f64).collect();
        let mut dst = vec![0.0; y1.len()];
        plan.execute_typed(&src, &mut dst)?;

        let back = TransposePlan::construct(&decomp, Pencil::Y1, Pencil::X1, &glsizes, 8)?;
        let mut round = vec![0.0; x1.len()];
        back.execute_typed(&dst, &mut round)?;
        if round != src {
            return Err(DecompError::invalid("pencil_dump", "x1", "round trip changed the X1 slab"));
        }

        let mut out = format!("rank {}\n", decomp.comm_rank());
        dump(&mut out, &x1, &src);
        dump(&mut out, &y1, &dst);
        back.destruct();
        plan.destruct();
        decomp.destruct();
        Ok(out)
    });
    for report in reports {
        print!("{}", report?);
    }
    println!("X1 -> Y1 -> X1 success");
    Ok(())
}
