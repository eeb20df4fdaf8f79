//! Rotate a 3D array through all six pencils under MPI and check it comes back.
//!
//! ```text
//! mpirun -n 4 cargo run --example mpi_transpose --features mpi-support -- [gx] [gy] [gz]
//! ```

use pencil_decomp::prelude::*;

fn arg(n: usize, default: usize) -> usize {
    std::env::args()
        .nth(n)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn main() -> Result<(), DecompError> {
    let comm = MpiComm::new()?;
    let glsizes = [arg(1, 32), arg(2, 24), arg(3, 16)];
    let decomp = Decomposition::construct(comm, &DecompConfig::new(3))?;

    let x1 = decomp.pencil_block(Pencil::X1, &glsizes)?;
    let original: Vec<f64> = (0..x1.len()).map(|i| x1.global_index(i) as f64).collect();

    for (label, forward) in [("forward", true), ("backward", false)] {
        let mut buf = original.clone();
        let mut pencil = Pencil::X1;
        for _ in 0..6 {
            let next = if forward { pencil.next() } else { pencil.prev() };
            let plan = TransposePlan::construct(&decomp, pencil, next, &glsizes, 8)?;
            let block = decomp.pencil_block(next, &glsizes)?;
            let mut out = vec![0.0; block.len()];
            plan.execute_typed(&buf, &mut out)?;
            if let Some(i) = (0..block.len()).find(|&i| out[i] != block.global_index(i) as f64) {
                eprintln!(
                    "rank {}: {pencil} -> {next} misplaced element at local {:?}",
                    decomp.comm_rank(),
                    block.local_indices(i)
                );
                std::process::exit(1);
            }
            plan.destruct();
            buf = out;
            pencil = next;
        }
        assert_eq!(buf, original);
        if decomp.comm_rank() == 0 {
            println!("{label} cycle over {:?} success", decomp.cart_topology().dims());
        }
    }
    decomp.destruct();
    Ok(())
}
