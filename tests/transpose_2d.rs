use pencil_decomp::prelude::*;
use serial_test::serial;

mod util;

const ELEMENT_SIZES: [usize; 5] = [1, 2, 4, 8, 16];

#[test]
fn four_by_five_on_two_processes() {
    let glsizes = [4, 5];
    let out = ThreadComm::run(2, |comm| {
        let d = util::auto_decomp(comm, 2);
        let x1 = d.pencil_block(Pencil::X1, &glsizes).unwrap();
        let y1 = d.pencil_block(Pencil::Y1, &glsizes).unwrap();
        let plan = TransposePlan::construct(&d, Pencil::X1, Pencil::Y1, &glsizes, 8).unwrap();
        let src = util::stamped(&x1, 8);
        let mut dst = vec![0u8; plan.recv_len()];
        plan.execute(&src, &mut dst).unwrap();
        util::assert_stamped(&y1, &dst, 8);
        plan.destruct();
        (
            x1.sizes().to_vec(),
            x1.offsets().to_vec(),
            y1.sizes().to_vec(),
            y1.offsets().to_vec(),
        )
    });
    assert_eq!(out[0], (vec![4, 2], vec![0, 0], vec![2, 5], vec![0, 0]));
    assert_eq!(out[1], (vec![4, 3], vec![0, 2], vec![2, 5], vec![2, 0]));
}

#[test]
#[serial]
fn round_trip_restores_every_element_size() {
    let glsizes = [7, 9];
    for nprocs in 1..=3 {
        ThreadComm::run(nprocs, |comm| {
            let d = util::auto_decomp(comm, 2);
            let x1 = d.pencil_block(Pencil::X1, &glsizes).unwrap();
            let y1 = d.pencil_block(Pencil::Y1, &glsizes).unwrap();
            for e in ELEMENT_SIZES {
                let fwd = TransposePlan::construct(&d, Pencil::X1, Pencil::Y1, &glsizes, e).unwrap();
                let bwd = TransposePlan::construct(&d, Pencil::Y1, Pencil::X1, &glsizes, e).unwrap();
                let src = util::stamped(&x1, e);
                let mut mid = vec![0u8; fwd.recv_len()];
                let mut back = vec![0u8; bwd.recv_len()];
                fwd.execute(&src, &mut mid).unwrap();
                util::assert_stamped(&y1, &mid, e);
                bwd.execute(&mid, &mut back).unwrap();
                assert_eq!(back, src, "element size {e}");
            }
        });
    }
}

#[test]
fn plans_are_reusable() {
    let glsizes = [6, 5];
    ThreadComm::run(3, |comm| {
        let d = util::auto_decomp(comm, 2);
        let y1 = d.pencil_block(Pencil::Y1, &glsizes).unwrap();
        let x1 = d.pencil_block(Pencil::X1, &glsizes).unwrap();
        let plan = TransposePlan::construct(&d, Pencil::Y1, Pencil::X1, &glsizes, 4).unwrap();
        let src = util::stamped(&y1, 4);
        for _ in 0..5 {
            let mut dst = vec![0u8; plan.recv_len()];
            plan.execute(&src, &mut dst).unwrap();
            util::assert_stamped(&x1, &dst, 4);
        }
    });
}

#[test]
fn typed_buffers_follow_the_same_layout() {
    let glsizes = [5, 4];
    ThreadComm::run(2, |comm| {
        let d = util::auto_decomp(comm, 2);
        let x1 = d.pencil_block(Pencil::X1, &glsizes).unwrap();
        let y1 = d.pencil_block(Pencil::Y1, &glsizes).unwrap();
        let plan = TransposePlan::construct(&d, Pencil::X1, Pencil::Y1, &glsizes, 8).unwrap();
        let src: Vec<f64> = (0..x1.len()).map(|i| x1.global_index(i) as f64).collect();
        let mut dst = vec![-1.0f64; y1.len()];
        plan.execute_typed(&src, &mut dst).unwrap();
        for (i, &v) in dst.iter().enumerate() {
            assert_eq!(v, y1.global_index(i) as f64);
        }
    });
}

#[test]
fn explicit_grid_and_periodic_axes() {
    let glsizes = [8, 8];
    let config = DecompConfig::new(2)
        .with_dims([1, 4])
        .with_periods([false, true]);
    let out = ThreadComm::run(4, |comm| {
        let d = Decomposition::construct(comm, &config).unwrap();
        let y1 = d.pencil_block(Pencil::Y1, &glsizes).unwrap();
        let x1 = d.pencil_block(Pencil::X1, &glsizes).unwrap();
        let plan = TransposePlan::construct(&d, Pencil::Y1, Pencil::X1, &glsizes, 2).unwrap();
        let mut dst = vec![0u8; plan.recv_len()];
        plan.execute(&util::stamped(&y1, 2), &mut dst).unwrap();
        util::assert_stamped(&x1, &dst, 2);
        d.neighbours(Pencil::X1, Axis::Y).unwrap()
    });
    assert_eq!(out[0], [Some(3), Some(1)]);
    assert_eq!(out[3], [Some(2), Some(0)]);
}

#[test]
fn illegal_and_infeasible_requests_fail_everywhere() {
    let out = ThreadComm::run(3, |comm| {
        let d = util::auto_decomp(comm, 2);
        let same = TransposePlan::construct(&d, Pencil::X1, Pencil::X1, &[9, 9], 8);
        let three_d = TransposePlan::construct(&d, Pencil::X1, Pencil::Z1, &[9, 9], 8);
        // Y1 splits x over three processes
        let narrow = TransposePlan::construct(&d, Pencil::X1, Pencil::Y1, &[2, 9], 8);
        [same, three_d, narrow].map(|r| r.unwrap_err().kind())
    });
    for kinds in out {
        assert_eq!(
            kinds,
            [
                ErrorKind::InvalidArgument,
                ErrorKind::InvalidArgument,
                ErrorKind::Infeasible
            ]
        );
    }
}
